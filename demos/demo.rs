use minidb::*;

fn main() -> Result<()> {
    println!("minidb demo\n");

    // Fresh data directory
    let dir = std::env::temp_dir().join("minidb-demo");
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    let db = Executor::open(&EngineConfig::with_data_dir(&dir))?;
    println!("Data directory: {}\n", dir.display());

    // Create tables
    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT UNIQUE, age INTEGER)",
        "CREATE TABLE events (id INTEGER PRIMARY KEY, title TEXT, date DATE, user_id INTEGER)",
        "CREATE TABLE tickets (id INTEGER PRIMARY KEY, event_id INTEGER, buyer_name TEXT, \
         UNIQUE(event_id, buyer_name))",
    ] {
        report(sql, &db.run(sql));
    }

    // Insert data
    println!("Inserting data...");
    for sql in [
        "INSERT INTO users VALUES (1, 'Alice', 30)",
        "INSERT INTO users (id, name) VALUES (2, 'Bob')", // Bob's age is unknown
        "INSERT INTO users VALUES (3, 'Charlie', 25)",
        "INSERT INTO events VALUES (1, 'Rust meetup', '2025-06-01', 1)",
        "INSERT INTO events VALUES (2, 'Workshop', '2025-07-15', 3)",
        "INSERT INTO tickets VALUES (1, 1, 'Bob')",
        "INSERT INTO tickets VALUES (2, 2, 'Alice')",
    ] {
        report(sql, &db.run(sql));
    }
    println!();

    // Constraint failures come back in the result, not as panics
    println!("Rejected statements:");
    for sql in [
        "INSERT INTO users VALUES (1, 'Dave', 41)",
        "INSERT INTO tickets VALUES (3, 1, 'Bob')",
        "INSERT INTO events VALUES (3, 'Party', 'tomorrow', 2)",
    ] {
        report(sql, &db.run(sql));
    }
    println!();

    // Read and print data
    println!("Reading data:");
    println!("{:<5} {:<10} {:<5}", "ID", "NAME", "AGE");
    println!("{}", "-".repeat(25));
    let res = db.run("SELECT * FROM users");
    for row in res.rows().unwrap_or_default() {
        let cell = |column: &str| row.get(column).map_or("NULL", String::as_str);
        println!("{:<5} {:<10} {:<5}", cell("id"), cell("name"), cell("age"));
    }
    println!();

    // Join
    println!("Who bought what:");
    let res = db.run(
        "SELECT tickets.buyer_name, events.title FROM tickets \
         INNER JOIN events ON tickets.event_id = events.id",
    );
    for row in res.rows().unwrap_or_default() {
        println!("  {} -> {}", row["tickets.buyer_name"], row["events.title"]);
    }
    println!();

    // Update and delete
    report(
        "UPDATE users SET age = 31 WHERE name = 'Alice'",
        &db.run("UPDATE users SET age = 31 WHERE name = 'Alice'"),
    );
    report(
        "DELETE FROM users WHERE id = 2",
        &db.run("DELETE FROM users WHERE id = 2"),
    );
    println!();

    // List tables
    println!("Tables in database:");
    for table_name in db.catalog().list_tables()? {
        println!("  - {}", table_name);
    }

    Ok(())
}

fn report(sql: &str, res: &ExecResult) {
    match &res.error {
        None => println!("  ok    {sql}"),
        Some(error) => println!("  error {sql}\n        {error}"),
    }
}

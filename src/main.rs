//! Interactive shell for a minidb data directory.
//!
//! ```bash
//! # interactive session on ./data
//! minidb
//!
//! # run one statement and print its result
//! minidb -d /tmp/db -c "SELECT * FROM users"
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use minidb::{EngineConfig, ExecResult, Executor};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "minidb", version, about = "Shell for a minidb data directory")]
struct Args {
    /// Directory holding the catalog, row files and indexes
    #[arg(short = 'd', long, default_value = "data", env = "MINIDB_DATA_DIR")]
    data_dir: PathBuf,

    /// Execute a single statement and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Write documents without indentation
    #[arg(long)]
    compact: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// A line starting with `.` is a shell command, anything else is SQL.
#[derive(Debug, PartialEq, Eq)]
enum Meta<'a> {
    Help,
    Tables,
    Schema(Option<&'a str>),
    Reset,
    Quit,
    Invalid(&'a str),
}

impl<'a> Meta<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let rest = line.strip_prefix('.')?;
        let mut parts = rest.split_whitespace();
        let meta = match (parts.next(), parts.next(), parts.next()) {
            (Some("help"), None, _) => Self::Help,
            (Some("tables"), None, _) => Self::Tables,
            (Some("schema"), table, None) => Self::Schema(table),
            (Some("reset"), None, _) => Self::Reset,
            (Some("quit" | "exit"), None, _) => Self::Quit,
            _ => Self::Invalid(line),
        };
        Some(meta)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("minidb=debug")
    } else {
        EnvFilter::new("minidb=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> minidb::Result<()> {
    let config = EngineConfig::with_data_dir(&args.data_dir).pretty_documents(!args.compact);
    let db = Executor::open(&config)?;

    if let Some(sql) = &args.command {
        print_result(&db.run(sql))?;
        return Ok(());
    }

    println!("minidb {} (type SQL or .help)", env!("CARGO_PKG_VERSION"));
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("db> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Meta::parse(line) {
            None => print_result(&db.run(line))?,
            Some(Meta::Quit) => break,
            Some(meta) => run_meta(&db, meta)?,
        }
    }
    println!("Bye.");
    Ok(())
}

fn run_meta(db: &Executor, meta: Meta<'_>) -> minidb::Result<()> {
    match meta {
        Meta::Help => println!("Commands: .help, .tables, .schema [table], .reset, .quit"),
        Meta::Tables => {
            let tables = db.catalog().list_tables()?;
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                println!("{}", tables.join(" "));
            }
        }
        Meta::Schema(None) => {
            for (table, schema) in db.catalog().schemas()? {
                println!("{table}: {}", serde_json::to_string(&schema)?);
            }
        }
        Meta::Schema(Some(table)) => match db.catalog().get_schema(table)? {
            Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
            None => println!("No such table: {table}"),
        },
        Meta::Reset => print_result(&db.drop_all_tables())?,
        Meta::Quit => {}
        Meta::Invalid(line) => println!("Unknown command: {line}"),
    }
    Ok(())
}

fn print_result(result: &ExecResult) -> minidb::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

use std::collections::HashMap;

use bitvec::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    ast::{
        ColumnsSelect, Condition, CreateTable, Delete, DropTable, InsertInto, Select, SelectJoin,
        Statement, Update,
    },
    catalog::Catalog,
    config::EngineConfig,
    error::{EngineError, ErrorKind, Result},
    index::IndexStore,
    parser::parse,
    storage::{Row, Storage},
    table::Schema,
    value::Value,
};

/// What a successful statement produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing to report, e.g. a failed statement or `DROP TABLE IF EXISTS`
    /// on a missing table.
    None,
    Created { table: String, schema: Schema },
    Dropped { table: String },
    Inserted { row: Row },
    Rows { rows: Vec<Row> },
    Updated { updated: bool, count: usize },
    Deleted { deleted: usize },
    DroppedAll { dropped_all: bool },
}

/// The envelope every statement returns. Failures never escape as panics
/// or `Err`; they land in `error` with `ok == false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecResult {
    pub ok: bool,
    pub value: Outcome,
    pub error: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl ExecResult {
    /// Rows of a `SELECT`, if this is one.
    pub fn rows(&self) -> Option<&[Row]> {
        match &self.value {
            Outcome::Rows { rows } => Some(rows),
            _ => None,
        }
    }
}

impl From<Result<Outcome>> for ExecResult {
    fn from(result: Result<Outcome>) -> Self {
        match result {
            Ok(value) => Self {
                ok: true,
                value,
                error: None,
                kind: None,
            },
            Err(e) => Self {
                ok: false,
                value: Outcome::None,
                kind: Some(e.kind()),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Which side of a join a column reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Realizes statements against the catalog, the row storage and the indexes.
///
/// The executor holds no state of its own beyond the three handles, so it is
/// cheap to rebuild and two executors on one directory see the same data.
#[derive(Debug, Clone)]
pub struct Executor {
    catalog: Catalog,
    storage: Storage,
    indexes: IndexStore,
}

impl Executor {
    /// Opens (and creates if needed) the engine rooted at `config.data_dir`.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(
            Catalog::open(config)?,
            Storage::open(config)?,
            IndexStore::open(config)?,
        ))
    }

    pub fn new(catalog: Catalog, storage: Storage, indexes: IndexStore) -> Self {
        Self {
            catalog,
            storage,
            indexes,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn indexes(&self) -> &IndexStore {
        &self.indexes
    }

    /// Parses and executes one statement.
    ///
    /// # Example
    /// ```
    /// use minidb::{EngineConfig, Executor};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let db = Executor::open(&EngineConfig::with_data_dir(dir.path())).unwrap();
    /// db.run("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)");
    /// db.run("INSERT INTO users (id, name) VALUES (1, 'Alice')");
    ///
    /// let res = db.run("SELECT * FROM users WHERE id = 1");
    /// assert!(res.ok);
    /// assert_eq!(res.rows().unwrap()[0]["name"], "Alice");
    /// ```
    pub fn run(&self, sql: &str) -> ExecResult {
        match parse(sql) {
            Ok(statement) => self.execute(statement),
            Err(e) => {
                debug!(error = %e, "statement rejected by parser");
                ExecResult::from(Err::<Outcome, _>(e))
            }
        }
    }

    /// Executes a parsed statement. Never panics on bad input; every failure
    /// comes back in the envelope.
    pub fn execute(&self, statement: Statement) -> ExecResult {
        let kind = statement.kind();
        let result = self.try_execute(statement);
        if let Err(e) = &result {
            debug!(statement = kind, error = %e, "statement failed");
        }
        result.into()
    }

    fn try_execute(&self, statement: Statement) -> Result<Outcome> {
        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::DropTable(drop) => self.drop_table(drop),
            Statement::InsertInto(insert) => self.insert(insert),
            Statement::Select(select) => self.select(select),
            Statement::SelectJoin(join) => self.select_join(join),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
            Statement::Unknown => Err(EngineError::UnknownCommand),
        }
    }

    /// Drops every table in the catalog.
    pub fn drop_all_tables(&self) -> ExecResult {
        let result = self.try_drop_all_tables();
        if let Err(e) = &result {
            debug!(error = %e, "drop of all tables failed");
        }
        result.into()
    }

    fn try_drop_all_tables(&self) -> Result<Outcome> {
        let names = self.catalog.list_tables()?;
        let count = names.len();
        for name in names {
            self.drop_table(DropTable {
                name,
                if_exists: false,
            })?;
        }
        info!(tables = count, "all tables dropped");
        Ok(Outcome::DroppedAll { dropped_all: true })
    }

    /// Rebuilds every index of `table` from its current rows.
    ///
    /// # Errors
    /// Returns [EngineError::NotFound] if the table does not exist.
    pub fn rebuild_indexes(&self, table: &str) -> Result<()> {
        let schema = self.schema(table)?;
        let rows = self.storage.read_all(table)?;
        for column in schema.indexed_columns() {
            self.indexes.index(table, &column.name).rebuild(&rows)?;
        }
        Ok(())
    }

    fn schema(&self, table: &str) -> Result<Schema> {
        self.catalog
            .get_schema(table)?
            .ok_or_else(|| EngineError::table_not_found(table))
    }

    fn create_table(&self, create: CreateTable) -> Result<Outcome> {
        let schema = Schema::new(create.columns, create.table_constraints);
        schema.validate()?;

        self.catalog.create_table(&create.name, schema.clone())?;
        self.storage.create_table(&create.name)?;
        // a previous table of the same name may have left index documents
        for column in schema.indexed_columns() {
            self.indexes.index(&create.name, &column.name).destroy()?;
        }

        Ok(Outcome::Created {
            table: create.name,
            schema,
        })
    }

    fn drop_table(&self, drop: DropTable) -> Result<Outcome> {
        let Some(schema) = self.catalog.get_schema(&drop.name)? else {
            if drop.if_exists {
                return Ok(Outcome::None);
            }
            return Err(EngineError::table_not_found(&drop.name));
        };

        self.catalog.drop_table(&drop.name)?;
        self.storage.drop_table(&drop.name)?;
        for column in schema.indexed_columns() {
            self.indexes.index(&drop.name, &column.name).destroy()?;
        }

        Ok(Outcome::Dropped { table: drop.name })
    }

    /// Executes an `INSERT` statement.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// 1. primary keys are present and not already taken,
    /// 2. single-column unique values are not already taken,
    /// 3. composite `UNIQUE(...)` combinations are not already taken,
    /// 4. every present value matches its column type.
    ///
    /// Only then is the row appended and each index told about it.
    fn insert(&self, insert: InsertInto) -> Result<Outcome> {
        let schema = self.schema(&insert.table)?;
        let row = build_row(&schema, &insert)?;
        let table = insert.table.as_str();
        let rows = self.storage.read_all(table)?;
        self.restore_missing_indexes(table, &schema, &rows)?;

        for column in schema.columns.iter().filter(|c| c.primary_key) {
            let Some(value) = row.get(&column.name) else {
                return Err(EngineError::ConstraintViolation(format!(
                    "primary key column '{}' cannot be null",
                    column.name
                )));
            };
            if self.value_taken(table, &column.name, value)? {
                return Err(EngineError::ConstraintViolation(format!(
                    "duplicate primary key '{value}' for column '{}'",
                    column.name
                )));
            }
        }

        for column in schema.columns.iter().filter(|c| c.unique && !c.primary_key) {
            let Some(value) = row.get(&column.name) else {
                continue;
            };
            if self.value_taken(table, &column.name, value)? {
                return Err(EngineError::ConstraintViolation(format!(
                    "duplicate unique value '{value}' for column '{}'",
                    column.name
                )));
            }
        }

        for constraint in &schema.table_constraints {
            let Some(key) = constraint
                .columns
                .iter()
                .map(|c| row.get(c))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let clash = rows.iter().any(|existing| {
                constraint
                    .columns
                    .iter()
                    .zip(&key)
                    .all(|(c, v)| existing.get(c) == Some(*v))
            });
            if clash {
                return Err(EngineError::ConstraintViolation(format!(
                    "duplicate unique value for ({})",
                    constraint.columns.join(", ")
                )));
            }
        }

        validate_types(&schema, &row)?;

        let ordinal = self.storage.append(table, &row)?;
        for column in schema.indexed_columns() {
            if let Some(value) = row.get(&column.name) {
                self.indexes.index(table, &column.name).add(value, ordinal)?;
            }
        }

        Ok(Outcome::Inserted { row })
    }

    /// True if some existing row holds `value` in the indexed `column`.
    fn value_taken(&self, table: &str, column: &str, value: &str) -> Result<bool> {
        let ordinals = self.indexes.index(table, column).lookup(value)?;
        Ok(!ordinals.is_empty())
    }

    /// Rebuilds from `rows` every index of `table` whose document is missing.
    /// An index is only ever extended from a complete document.
    fn restore_missing_indexes(&self, table: &str, schema: &Schema, rows: &[Row]) -> Result<()> {
        for column in schema.indexed_columns() {
            let index = self.indexes.index(table, &column.name);
            if !index.exists() {
                debug!(table, column = %column.name, rows = rows.len(), "restoring missing index");
                index.rebuild(rows)?;
            }
        }
        Ok(())
    }

    /// Rows of `table` matching `condition`, in ordinal order.
    ///
    /// An equality on an indexed column is answered from the index; any other
    /// column falls back to a full scan. Both paths return the same rows.
    fn matching_rows(
        &self,
        table: &str,
        schema: &Schema,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Row>> {
        let rows = self.storage.read_all(table)?;

        let indexed = schema.column(column).is_some_and(|c| c.is_indexed());
        if let (true, Some(text)) = (indexed, value.as_str()) {
            let index = self.indexes.index(table, column);
            if !index.exists() {
                debug!(table, column, "restoring missing index");
                index.rebuild(&rows)?;
            }
            debug!(table, column, "equality answered from index");
            let mut found = Vec::new();
            for ordinal in index.lookup(text)? {
                match rows.get(ordinal) {
                    Some(row) if matches_condition(row, column, value) => found.push(row.clone()),
                    Some(_) => warn!(table, column, ordinal, "index entry points at another value"),
                    None => warn!(table, column, ordinal, "index entry past the last row"),
                }
            }
            return Ok(found);
        }

        debug!(table, column, "equality answered by scan");
        Ok(rows
            .into_iter()
            .filter(|row| matches_condition(row, column, value))
            .collect())
    }

    fn select(&self, select: Select) -> Result<Outcome> {
        let schema = self.schema(&select.table)?;

        let projection = match &select.columns {
            ColumnsSelect::Star => None,
            ColumnsSelect::ColumnsNames(names) => Some(
                names
                    .iter()
                    .map(|name| {
                        let column = resolve_column(&schema, &select.table, name)?;
                        Ok((name.clone(), column))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let rows = match &select.condition {
            None => self.storage.read_all(&select.table)?,
            Some(condition) => {
                let column = resolve_column(&schema, &select.table, &condition.column)?;
                self.matching_rows(&select.table, &schema, &column, &condition.value)?
            }
        };

        let rows = match projection {
            None => rows,
            Some(projection) => rows.iter().map(|row| project(row, &projection)).collect(),
        };
        Ok(Outcome::Rows { rows })
    }

    /// Executes a two-table inner equality join.
    ///
    /// Every column of the combined row is keyed `table.column`. The optional
    /// `WHERE` is evaluated on the combined row, then the projection is taken.
    fn select_join(&self, join: SelectJoin) -> Result<Outcome> {
        let left_schema = self.schema(&join.left_table)?;
        let right_schema = self.schema(&join.right_table)?;
        let resolver = JoinResolver {
            left_table: &join.left_table,
            left: &left_schema,
            right_table: &join.right_table,
            right: &right_schema,
        };

        let (side_a, col_a) = resolver.resolve(&join.on.left)?;
        let (side_b, col_b) = resolver.resolve(&join.on.right)?;
        let (left_key, right_key) = match (side_a, side_b) {
            (Side::Left, Side::Right) => (col_a, col_b),
            (Side::Right, Side::Left) => (col_b, col_a),
            _ => {
                return Err(EngineError::Column(format!(
                    "join condition {} = {} must compare {} with {}",
                    join.on.left, join.on.right, join.left_table, join.right_table
                )));
            }
        };

        let filter = match &join.condition {
            None => None,
            Some(Condition { column, value }) => {
                let (side, name) = resolver.resolve(column)?;
                Some((resolver.qualify(side, &name), value))
            }
        };

        let projection = match &join.columns {
            ColumnsSelect::Star => None,
            ColumnsSelect::ColumnsNames(names) => Some(
                names
                    .iter()
                    .map(|name| {
                        let (side, column) = resolver.resolve(name)?;
                        Ok((name.clone(), resolver.qualify(side, &column)))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let left_rows = self.storage.read_all(&join.left_table)?;
        let right_rows = self.storage.read_all(&join.right_table)?;

        let mut by_key: HashMap<&str, Vec<&Row>> = HashMap::new();
        for row in &right_rows {
            if let Some(key) = row.get(&right_key) {
                by_key.entry(key.as_str()).or_default().push(row);
            }
        }

        let mut rows = Vec::new();
        for left in &left_rows {
            let Some(matches) = left.get(&left_key).and_then(|k| by_key.get(k.as_str())) else {
                continue;
            };
            for right in matches {
                let combined = resolver.combine(left, right);
                if let Some((column, value)) = &filter
                    && !matches_condition(&combined, column, value)
                {
                    continue;
                }
                rows.push(match &projection {
                    None => combined,
                    Some(projection) => project(&combined, projection),
                });
            }
        }

        Ok(Outcome::Rows { rows })
    }

    /// Executes an `UPDATE` statement.
    ///
    /// Every matched row is rebuilt and type-checked before anything is
    /// written, so a bad value leaves the table and its indexes untouched.
    /// Uniqueness is not re-checked against other rows.
    fn update(&self, update: Update) -> Result<Outcome> {
        let schema = self.schema(&update.table)?;
        let table = update.table.as_str();
        let condition_column = resolve_column(&schema, table, &update.condition.column)?;
        for (column, _) in &update.assignments {
            if !schema.has_column(column) {
                return Err(EngineError::Column(format!(
                    "column '{column}' does not exist in table '{table}'"
                )));
            }
        }

        let mut rows = self.storage.read_all(table)?;
        self.restore_missing_indexes(table, &schema, &rows)?;
        let mut changes = Vec::new();
        for (ordinal, row) in rows.iter().enumerate() {
            if !matches_condition(row, &condition_column, &update.condition.value) {
                continue;
            }
            let mut candidate = row.clone();
            for (column, value) in &update.assignments {
                match value.as_str() {
                    Some(text) => candidate.insert(column.clone(), text.to_string()),
                    None => candidate.remove(column),
                };
            }
            validate_types(&schema, &candidate)?;
            changes.push((ordinal, candidate));
        }

        for (ordinal, candidate) in &changes {
            let before = &rows[*ordinal];
            for column in schema.indexed_columns() {
                let (old, new) = (before.get(&column.name), candidate.get(&column.name));
                if old == new {
                    continue;
                }
                let index = self.indexes.index(table, &column.name);
                if let Some(old) = old {
                    index.remove(old, *ordinal)?;
                }
                if let Some(new) = new {
                    index.add(new, *ordinal)?;
                }
            }
        }

        let count = changes.len();
        for (ordinal, candidate) in changes {
            rows[ordinal] = candidate;
        }
        if count > 0 {
            self.storage.overwrite_all(table, &rows)?;
        }

        Ok(Outcome::Updated {
            updated: count > 0,
            count,
        })
    }

    /// Executes a `DELETE` statement.
    ///
    /// Deletion is physical: kept rows are written back and move down to
    /// fill the gaps, so every index of the table is rebuilt against the new
    /// ordinals once the removed pairings are gone.
    fn delete(&self, delete: Delete) -> Result<Outcome> {
        let schema = self.schema(&delete.table)?;
        let table = delete.table.as_str();
        let column = resolve_column(&schema, table, &delete.condition.column)?;

        let rows = self.storage.read_all(table)?;
        let removed: BitVec = rows
            .iter()
            .map(|row| matches_condition(row, &column, &delete.condition.value))
            .collect();
        let deleted = removed.count_ones();
        if deleted == 0 {
            return Ok(Outcome::Deleted { deleted });
        }
        self.restore_missing_indexes(table, &schema, &rows)?;

        for ordinal in removed.iter_ones() {
            for indexed in schema.indexed_columns() {
                if let Some(value) = rows[ordinal].get(&indexed.name) {
                    self.indexes.index(table, &indexed.name).remove(value, ordinal)?;
                }
            }
        }

        let kept: Vec<Row> = rows
            .into_iter()
            .zip(removed.iter().by_vals())
            .filter_map(|(row, gone)| (!gone).then_some(row))
            .collect();
        self.storage.overwrite_all(table, &kept)?;

        for indexed in schema.indexed_columns() {
            self.indexes.index(table, &indexed.name).rebuild(&kept)?;
        }

        Ok(Outcome::Deleted { deleted })
    }
}

/// Resolves `name`, possibly written `table.column`, against one table.
fn resolve_column(schema: &Schema, table: &str, name: &str) -> Result<String> {
    let column = match name.split_once('.') {
        Some((qualifier, column)) if qualifier == table => column,
        Some(_) => {
            return Err(EngineError::Column(format!(
                "column '{name}' does not belong to table '{table}'"
            )));
        }
        None => name,
    };
    if !schema.has_column(column) {
        return Err(EngineError::Column(format!(
            "column '{column}' does not exist in table '{table}'"
        )));
    }
    Ok(column.to_string())
}

struct JoinResolver<'a> {
    left_table: &'a str,
    left: &'a Schema,
    right_table: &'a str,
    right: &'a Schema,
}

impl JoinResolver<'_> {
    /// A qualified name picks its table; an unqualified one tries the left
    /// table first, then the right.
    fn resolve(&self, name: &str) -> Result<(Side, String)> {
        let found = match name.split_once('.') {
            Some((qualifier, column)) if qualifier == self.left_table => {
                self.left.has_column(column).then_some((Side::Left, column))
            }
            Some((qualifier, column)) if qualifier == self.right_table => {
                self.right.has_column(column).then_some((Side::Right, column))
            }
            Some(_) => None,
            None if self.left.has_column(name) => Some((Side::Left, name)),
            None if self.right.has_column(name) => Some((Side::Right, name)),
            None => None,
        };
        found
            .map(|(side, column)| (side, column.to_string()))
            .ok_or_else(|| {
                EngineError::Column(format!(
                    "column '{name}' does not exist in {} or {}",
                    self.left_table, self.right_table
                ))
            })
    }

    fn qualify(&self, side: Side, column: &str) -> String {
        match side {
            Side::Left => format!("{}.{column}", self.left_table),
            Side::Right => format!("{}.{column}", self.right_table),
        }
    }

    fn combine(&self, left: &Row, right: &Row) -> Row {
        let left_cells = left.iter().map(|(c, v)| (self.qualify(Side::Left, c), v.clone()));
        let right_cells = right.iter().map(|(c, v)| (self.qualify(Side::Right, c), v.clone()));
        left_cells.chain(right_cells).collect()
    }
}

/// Turns the statement's column/value lists into a row keyed by column name.
/// `NULL` values are left out.
fn build_row(schema: &Schema, insert: &InsertInto) -> Result<Row> {
    let columns: Vec<&str> = match &insert.columns {
        None => schema.column_names(),
        Some(columns) => columns.iter().map(String::as_str).collect(),
    };

    if columns.len() != insert.values.len() {
        return Err(EngineError::Column(format!(
            "table '{}' expects {} values, got {}",
            insert.table,
            columns.len(),
            insert.values.len()
        )));
    }

    let mut row = Row::new();
    let mut seen = Vec::with_capacity(columns.len());
    for (column, value) in columns.into_iter().zip(&insert.values) {
        if !schema.has_column(column) {
            return Err(EngineError::Column(format!(
                "column '{column}' does not exist in table '{}'",
                insert.table
            )));
        }
        if seen.contains(&column) {
            return Err(EngineError::Column(format!(
                "column '{column}' is listed twice"
            )));
        }
        seen.push(column);
        if let Some(text) = value.as_str() {
            row.insert(column.to_string(), text.to_string());
        }
    }
    Ok(row)
}

/// Checks every present value of `row` against its declared type.
fn validate_types(schema: &Schema, row: &Row) -> Result<()> {
    for column in &schema.columns {
        let Some(value) = row.get(&column.name) else {
            continue;
        };
        if !column.data_type.accepts(value) {
            return Err(EngineError::Type {
                column: column.name.clone(),
                expected: column.data_type,
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// String equality on one column. `NULL` matches rows where the column is
/// absent.
fn matches_condition(row: &Row, column: &str, value: &Value) -> bool {
    row.get(column).map(String::as_str) == value.as_str()
}

fn project(row: &Row, projection: &[(String, String)]) -> Row {
    projection
        .iter()
        .filter_map(|(output, column)| row.get(column).map(|v| (output.clone(), v.clone())))
        .collect()
}

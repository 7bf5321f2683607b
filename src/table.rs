use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::{EngineError, Result};

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
            unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Primary-key and unique columns are the ones that get an index.
    pub fn is_indexed(&self) -> bool {
        self.primary_key || self.unique
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Unique,
}

/// A table-level constraint spanning one or more columns, e.g.
/// `UNIQUE(event_id, buyer_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConstraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
}

impl TableConstraint {
    pub fn unique(columns: Vec<String>) -> Self {
        Self {
            kind: ConstraintKind::Unique,
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub table_constraints: Vec<TableConstraint>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>, table_constraints: Vec<TableConstraint>) -> Self {
        Self {
            columns,
            table_constraints,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns that carry an index, in declaration order.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_indexed())
    }

    /// Checks the definition is internally consistent.
    ///
    /// # Errors
    /// Returns [EngineError::Schema] if the table has no column, a column
    /// name repeats, or a table constraint is empty or names an unknown
    /// column.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(EngineError::Schema("a table needs at least one column".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EngineError::Schema(format!(
                    "column '{}' is declared twice",
                    column.name
                )));
            }
        }

        for constraint in &self.table_constraints {
            if constraint.columns.is_empty() {
                return Err(EngineError::Schema(
                    "UNIQUE column list cannot be empty".into(),
                ));
            }
            if let Some(unknown) = constraint.columns.iter().find(|c| !self.has_column(c)) {
                return Err(EngineError::Schema(format!(
                    "UNIQUE references unknown column '{unknown}'"
                )));
            }
        }
        Ok(())
    }
}

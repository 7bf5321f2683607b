use serde::Serialize;
use thiserror::Error;

use crate::data_type::DataType;

/// Fieldless tag for each [EngineError] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownCommand,
    Syntax,
    NotFound,
    AlreadyExists,
    ConstraintViolation,
    Type,
    Column,
    Schema,
    Storage,
}

/// Every failure the engine can report.
///
/// Internal layers return `Result<T, EngineError>` and propagate with `?`.
/// Only [crate::Executor::execute] turns it into an
/// [crate::ExecResult] envelope.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The statement kind has no executor transition.
    #[error("unknown command")]
    UnknownCommand,
    /// The parser could not derive a statement from the input.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// A referenced table does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A table with the same name is already in the catalog.
    #[error("{0}")]
    AlreadyExists(String),
    /// Primary-key, unique or composite-unique breach.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// A value does not match the declared column type.
    #[error("type error: column '{column}' expects {expected}, got '{value}'")]
    Type {
        column: String,
        expected: DataType,
        value: String,
    },
    /// A statement references a column absent from the schema.
    #[error("column error: {0}")]
    Column(String),
    /// The table definition itself is invalid.
    #[error("schema error: {0}")]
    Schema(String),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCommand => ErrorKind::UnknownCommand,
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::Type { .. } => ErrorKind::Type,
            Self::Column(_) => ErrorKind::Column,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Io(_) | Self::Document(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn table_not_found(table: &str) -> Self {
        Self::NotFound(format!("table '{table}' does not exist"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

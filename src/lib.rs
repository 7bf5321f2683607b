pub mod ast;
pub mod catalog;
pub mod config;
pub mod data_type;
mod document;
pub mod error;
pub mod executor;
pub mod index;
pub mod parser;
pub mod storage;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use catalog::Catalog;
pub use config::EngineConfig;
pub use data_type::DataType;
pub use error::{EngineError, ErrorKind, Result};
pub use executor::{ExecResult, Executor, Outcome};
pub use index::{Index, IndexStore};
pub use parser::parse;
pub use storage::{Row, Storage};
pub use table::{ColumnDef, Schema, TableConstraint};
pub use value::Value;

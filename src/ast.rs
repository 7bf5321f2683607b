use crate::table::{ColumnDef, TableConstraint};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    DropTable(DropTable),
    InsertInto(InsertInto),
    Select(Select),
    SelectJoin(SelectJoin),
    Update(Update),
    Delete(Delete),
    /// Produced for empty input only.
    Unknown,
}

impl Statement {
    /// Short lowercase name of the statement kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "create_table",
            Self::DropTable(_) => "drop_table",
            Self::InsertInto(_) => "insert",
            Self::Select(_) => "select",
            Self::SelectJoin(_) => "select_join",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub table_constraints: Vec<TableConstraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertInto {
    pub table: String,
    /// `None` means positional over the schema's declared columns.
    pub columns: Option<Vec<String>>,
    pub values: Vec<Value>,
}

/// A single equality test, `column = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnsSelect {
    Star,
    ColumnsNames(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub table: String,
    pub condition: Option<Condition>,
}

/// The `ON left = right` part of a join; both sides may be qualified.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectJoin {
    pub columns: ColumnsSelect,
    pub left_table: String,
    pub right_table: String,
    pub on: JoinOn,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub condition: Condition,
}

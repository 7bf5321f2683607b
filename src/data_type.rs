use std::fmt;

use serde::{Deserialize, Serialize};

/// Represents the supported data types in a table schema.
///
/// Rows are stored as text; a type only decides which textual values a
/// column accepts at insert and update time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// Digits only, e.g. `42` or `007`.
    Integer,
    /// Anything that parses as a 64-bit float.
    Float,
    /// `TRUE` or `FALSE`, in any case.
    Boolean,
    /// The literal shape `YYYY-MM-DD`.
    Date,
    /// Accepts any value.
    Text,
}

impl DataType {
    /// Resolves a type name as written in `CREATE TABLE`, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Some(Self::Integer),
            "FLOAT" | "REAL" => Some(Self::Float),
            "BOOLEAN" | "BOOL" => Some(Self::Boolean),
            "DATE" => Some(Self::Date),
            "TEXT" => Some(Self::Text),
            _ => None,
        }
    }

    /// Returns true if `value` is an acceptable textual representation for
    /// this type.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Integer => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Self::Float => value.parse::<f64>().is_ok(),
            Self::Boolean => {
                value.eq_ignore_ascii_case("TRUE") || value.eq_ignore_ascii_case("FALSE")
            }
            Self::Date => is_date_shaped(value),
            Self::Text => true,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Text => "TEXT",
        };
        f.write_str(name)
    }
}

// Shape check only: `2024-13-45` passes.
fn is_date_shaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(DataType::from_name("integer"), Some(DataType::Integer));
        assert_eq!(DataType::from_name("INT"), Some(DataType::Integer));
        assert_eq!(DataType::from_name("Real"), Some(DataType::Float));
        assert_eq!(DataType::from_name("bool"), Some(DataType::Boolean));
        assert_eq!(DataType::from_name("date"), Some(DataType::Date));
        assert_eq!(DataType::from_name("text"), Some(DataType::Text));
        assert_eq!(DataType::from_name("VARCHAR"), None);
    }

    #[test]
    fn test_integer_is_digits_only() {
        assert!(DataType::Integer.accepts("42"));
        assert!(DataType::Integer.accepts("007"));
        assert!(!DataType::Integer.accepts(""));
        assert!(!DataType::Integer.accepts("-1"));
        assert!(!DataType::Integer.accepts("1.0"));
        assert!(!DataType::Integer.accepts("abc"));
    }

    #[test]
    fn test_float_parses() {
        assert!(DataType::Float.accepts("3.14"));
        assert!(DataType::Float.accepts("-2"));
        assert!(DataType::Float.accepts("1e5"));
        assert!(!DataType::Float.accepts("pi"));
        assert!(!DataType::Float.accepts(""));
    }

    #[test]
    fn test_boolean_case_insensitive() {
        assert!(DataType::Boolean.accepts("TRUE"));
        assert!(DataType::Boolean.accepts("false"));
        assert!(DataType::Boolean.accepts("True"));
        assert!(!DataType::Boolean.accepts("1"));
        assert!(!DataType::Boolean.accepts("yes"));
    }

    #[test]
    fn test_date_pattern() {
        assert!(DataType::Date.accepts("2024-01-31"));
        assert!(DataType::Date.accepts("2024-13-45"));
        assert!(!DataType::Date.accepts("2024-1-31"));
        assert!(!DataType::Date.accepts("2024/01/31"));
        assert!(!DataType::Date.accepts("2024-01-31T00:00"));
    }

    #[test]
    fn test_text_accepts_anything() {
        assert!(DataType::Text.accepts(""));
        assert!(DataType::Text.accepts("O'Brien"));
    }

    #[test]
    fn test_serde_uses_sql_names() {
        let json = serde_json::to_string(&DataType::Boolean).unwrap();
        assert_eq!(json, "\"BOOLEAN\"");
        let back: DataType = serde_json::from_str("\"DATE\"").unwrap();
        assert_eq!(back, DataType::Date);
    }
}

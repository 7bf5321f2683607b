/// A literal as written in a statement.
///
/// The engine keeps row values as text, so a literal is either its canonical
/// text or SQL `NULL`. Quoting does not matter: `1` and `'1'` are the same
/// value, and constraint checks and indexes compare exactly this text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// The unquoted keyword `NULL`; the column is left absent.
    Null,
    /// Any other literal, quotes stripped and `''` unescaped.
    Text(String),
}

impl Value {
    /// Returns the canonical text, or `None` for [Value::Null].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::Null.as_str(), None);
    }

    #[test]
    fn test_from_string() {
        assert_eq!(Value::from(String::from("1")), Value::from("1"));
    }
}

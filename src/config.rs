//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where and how the engine persists its documents.
///
/// # Example
///
/// ```rust
/// use minidb::EngineConfig;
///
/// let config = EngineConfig::with_data_dir("/tmp/minidb").pretty_documents(false);
/// assert!(!config.pretty_documents);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the catalog, row and index documents.
    pub data_dir: PathBuf,

    /// Indent catalog and index documents for human inspection.
    /// Row files are JSON Lines and always compact.
    pub pretty_documents: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            pretty_documents: true,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration rooted at `data_dir`.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn pretty_documents(mut self, pretty: bool) -> Self {
        self.pretty_documents = pretty;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = EngineConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.pretty_documents);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"data_dir": "/var/lib/minidb"}"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/minidb"));
        assert!(config.pretty_documents);
    }
}

//! Hash indexes over primary-key and unique columns.
//!
//! One JSON document per (table, column) maps a value to the set of row
//! ordinals holding it. Indexes are derived state: [Index::rebuild] restores
//! one from the row sequence at any time.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::config::EngineConfig;
use crate::document;
use crate::error::Result;
use crate::storage::Row;

type Entries = BTreeMap<String, BTreeSet<usize>>;

/// Factory for the [Index] handles of one data directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
    pretty: bool,
}

impl IndexStore {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            dir: config.data_dir.clone(),
            pretty: config.pretty_documents,
        })
    }

    /// Handle for the index of `table.column`, stored as `<table>.<column>.idx`.
    /// Identifiers never contain `.`, so distinct pairs never share a file.
    pub fn index(&self, table: &str, column: &str) -> Index {
        Index {
            table: table.to_string(),
            column: column.to_string(),
            path: self.dir.join(format!("{table}.{column}.idx")),
            pretty: self.pretty,
        }
    }
}

/// Value to ordinal-set mapping for one column of one table.
#[derive(Debug, Clone)]
pub struct Index {
    table: String,
    column: String,
    path: PathBuf,
    pretty: bool,
}

impl Index {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// True once the index document has been written.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> Result<Entries> {
        document::read_or_default(&self.path)
    }

    fn save(&self, entries: &Entries) -> Result<()> {
        document::write(&self.path, entries, self.pretty)
    }

    /// Records that row `ordinal` holds `value`. Adding a pairing twice is a
    /// no-op.
    pub fn add(&self, value: &str, ordinal: usize) -> Result<()> {
        let mut entries = self.load()?;
        entries.entry(value.to_string()).or_default().insert(ordinal);
        self.save(&entries)
    }

    /// Forgets that row `ordinal` holds `value`. The key disappears with its
    /// last ordinal; removing an unknown pairing does nothing.
    pub fn remove(&self, value: &str, ordinal: usize) -> Result<()> {
        let mut entries = self.load()?;
        let Some(ordinals) = entries.get_mut(value) else {
            return Ok(());
        };
        if !ordinals.remove(&ordinal) {
            return Ok(());
        }
        if ordinals.is_empty() {
            entries.remove(value);
        }
        self.save(&entries)
    }

    /// Ordinals of the rows holding `value`; empty when the value is unknown.
    pub fn lookup(&self, value: &str) -> Result<BTreeSet<usize>> {
        Ok(self.load()?.remove(value).unwrap_or_default())
    }

    /// Clears every entry.
    pub fn reset(&self) -> Result<()> {
        self.save(&Entries::new())
    }

    /// Resets the index and re-adds `(row[column], ordinal)` for every row,
    /// ordinals being positions in `rows`. Rows without the column are
    /// skipped.
    pub fn rebuild<'a, I>(&self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut entries = Entries::new();
        for (ordinal, row) in rows.into_iter().enumerate() {
            if let Some(value) = row.get(&self.column) {
                entries.entry(value.clone()).or_default().insert(ordinal);
            }
        }
        debug!(
            table = %self.table,
            column = %self.column,
            keys = entries.len(),
            "index rebuilt"
        );
        self.save(&entries)
    }

    /// Removes the index document.
    pub fn destroy(&self) -> Result<()> {
        document::remove(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> IndexStore {
        IndexStore::open(&EngineConfig::with_data_dir(tmp.path())).unwrap()
    }

    fn set(ordinals: &[usize]) -> BTreeSet<usize> {
        ordinals.iter().copied().collect()
    }

    #[test]
    fn test_index_created_lazily() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("users", "id");

        assert!(!idx.exists());
        assert!(idx.lookup("1").unwrap().is_empty());

        idx.add("1", 0).unwrap();
        assert!(idx.exists());
        assert!(idx.path().ends_with("users.id.idx"));
    }

    #[test]
    fn test_underscored_names_get_separate_files() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let first = store.index("a", "b_c");
        let second = store.index("a_b", "c");

        first.add("1", 0).unwrap();
        second.add("1", 4).unwrap();
        assert_ne!(first.path(), second.path());

        second.destroy().unwrap();
        assert_eq!(first.lookup("1").unwrap(), set(&[0]));
    }

    #[test]
    fn test_add_multiple_values_and_lookup() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("orders", "buyer");

        idx.add("Alice", 0).unwrap();
        idx.add("Alice", 1).unwrap();
        idx.add("Bob", 2).unwrap();

        assert_eq!(idx.lookup("Alice").unwrap(), set(&[0, 1]));
        assert_eq!(idx.lookup("Bob").unwrap(), set(&[2]));
        assert!(idx.lookup("Charlie").unwrap().is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("t", "c");

        idx.add("x", 3).unwrap();
        idx.add("x", 3).unwrap();

        assert_eq!(idx.lookup("x").unwrap(), set(&[3]));
    }

    #[test]
    fn test_remove_drops_empty_key() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("products", "sku");
        idx.add("ABC123", 0).unwrap();
        idx.add("ABC123", 1).unwrap();

        idx.remove("ABC123", 0).unwrap();
        assert_eq!(idx.lookup("ABC123").unwrap(), set(&[1]));

        idx.remove("ABC123", 1).unwrap();
        assert!(idx.lookup("ABC123").unwrap().is_empty());

        let doc = fs::read_to_string(idx.path()).unwrap();
        assert!(!doc.contains("ABC123"));
    }

    #[test]
    fn test_remove_unknown_pairing_is_noop() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("t", "c");
        idx.add("x", 0).unwrap();

        idx.remove("x", 5).unwrap();
        idx.remove("y", 0).unwrap();

        assert_eq!(idx.lookup("x").unwrap(), set(&[0]));
    }

    #[test]
    fn test_persists_between_handles() {
        let tmp = TempDir::new().unwrap();
        store(&tmp).index("sessions", "token").add("xyz", 0).unwrap();

        let other = store(&tmp).index("sessions", "token");
        assert_eq!(other.lookup("xyz").unwrap(), set(&[0]));
    }

    #[test]
    fn test_reset_and_rebuild() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("users", "id");
        idx.add("stale", 7).unwrap();

        let rows: Vec<Row> = [Some("1"), None, Some("3")]
            .into_iter()
            .map(|id| {
                let mut row = Row::new();
                if let Some(id) = id {
                    row.insert("id".into(), id.into());
                }
                row
            })
            .collect();
        idx.rebuild(&rows).unwrap();

        assert!(idx.lookup("stale").unwrap().is_empty());
        assert_eq!(idx.lookup("1").unwrap(), set(&[0]));
        assert_eq!(idx.lookup("3").unwrap(), set(&[2]));

        idx.reset().unwrap();
        assert!(idx.lookup("1").unwrap().is_empty());
        assert!(idx.exists());
    }

    #[test]
    fn test_destroy() {
        let tmp = TempDir::new().unwrap();
        let idx = store(&tmp).index("t", "c");
        idx.add("x", 0).unwrap();

        idx.destroy().unwrap();
        assert!(!idx.exists());
        idx.destroy().unwrap();
    }
}

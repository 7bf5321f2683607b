//! Per-table row sequences, persisted as JSON Lines.
//!
//! Storage knows nothing about schemas or constraints. A row is addressed by
//! its ordinal, the zero-based position in the current sequence, and that
//! position shifts whenever [Storage::overwrite_all] drops earlier rows.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::config::EngineConfig;
use crate::document;
use crate::error::Result;

/// One stored row: column name to its textual value. A column missing from
/// the map is absent for that row.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            dir: config.data_dir.clone(),
        })
    }

    pub fn table_file(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.db"))
    }

    /// Starts an empty row file for `table`, discarding any leftover one.
    pub fn create_table(&self, table: &str) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.table_file(table))?;
        Ok(())
    }

    /// Appends `row` and returns its ordinal, the row count before the append.
    pub fn append(&self, table: &str, row: &Row) -> Result<usize> {
        let ordinal = self.row_count(table)?;

        let mut line = serde_json::to_vec(row)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_file(table))?;
        file.write_all(&line)?;

        debug!(table, ordinal, "row appended");
        Ok(ordinal)
    }

    /// Returns every row in order. A table without a row file is empty.
    pub fn read_all(&self, table: &str) -> Result<Vec<Row>> {
        let file = match fs::File::open(self.table_file(table)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(serde_json::from_str(&line)?);
        }
        Ok(rows)
    }

    /// Counts stored rows without decoding them.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let file = match fs::File::open(self.table_file(table)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        for line in BufReader::new(file).lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Replaces the whole row sequence. Used for in-place edits and for
    /// compaction after deletes.
    pub fn overwrite_all(&self, table: &str, rows: &[Row]) -> Result<()> {
        document::replace_with(&self.table_file(table), |out| {
            for row in rows {
                serde_json::to_writer(&mut *out, row)?;
                out.write_all(b"\n")?;
            }
            Ok(())
        })?;
        debug!(table, rows = rows.len(), "row file rewritten");
        Ok(())
    }

    /// Deletes the table's rows. A missing file is not an error.
    pub fn drop_table(&self, table: &str) -> Result<()> {
        document::remove(&self.table_file(table))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> Storage {
        Storage::open(&EngineConfig::with_data_dir(tmp.path())).unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_append_and_read_all() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);
        let row1 = row(&[("id", "1"), ("name", "Alice")]);
        let row2 = row(&[("id", "2"), ("name", "Bob")]);

        assert_eq!(storage.append("users", &row1).unwrap(), 0);
        assert_eq!(storage.append("users", &row2).unwrap(), 1);

        assert_eq!(storage.read_all("users").unwrap(), vec![row1, row2]);
        assert_eq!(storage.row_count("users").unwrap(), 2);
    }

    #[test]
    fn test_read_all_missing_table() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);

        assert!(storage.read_all("nonexistent").unwrap().is_empty());
        assert_eq!(storage.row_count("nonexistent").unwrap(), 0);
    }

    #[test]
    fn test_file_is_one_json_object_per_line() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);
        storage.append("t", &row(&[("id", "1")])).unwrap();
        storage.append("t", &row(&[("id", "2")])).unwrap();

        let text = fs::read_to_string(storage.table_file("t")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![r#"{"id":"1"}"#, r#"{"id":"2"}"#]);
    }

    #[test]
    fn test_overwrite_all_compacts() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);
        for id in ["1", "2", "3"] {
            storage.append("t", &row(&[("id", id)])).unwrap();
        }

        storage
            .overwrite_all("t", &[row(&[("id", "1")]), row(&[("id", "3")])])
            .unwrap();

        let rows = storage.read_all("t").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], "3");
        assert_eq!(storage.append("t", &row(&[("id", "4")])).unwrap(), 2);
    }

    #[test]
    fn test_create_and_drop_table() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);

        storage.append("temp", &row(&[("id", "leftover")])).unwrap();
        storage.create_table("temp").unwrap();
        assert!(storage.table_file("temp").exists());
        assert!(storage.read_all("temp").unwrap().is_empty());

        storage.drop_table("temp").unwrap();
        assert!(!storage.table_file("temp").exists());

        // dropping again is fine
        storage.drop_table("temp").unwrap();
    }

    #[test]
    fn test_values_with_quotes_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);
        let r = row(&[("name", "O'Brien \"Bob\"\nJr")]);

        storage.append("t", &r).unwrap();

        assert_eq!(storage.read_all("t").unwrap(), vec![r]);
    }
}

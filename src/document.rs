//! Whole-document JSON persistence shared by the catalog and the indexes.
//!
//! A document is read in full, modified in memory and written back in full.
//! Writes go to a sibling temp file first and are renamed over the target.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Reads the document at `path`, or `T::default()` when it does not exist.
pub(crate) fn read_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Replaces the document at `path` with `value`.
pub(crate) fn write<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    replace_with(path, |out| {
        if pretty {
            serde_json::to_writer_pretty(&mut *out, value)?;
        } else {
            serde_json::to_writer(&mut *out, value)?;
        }
        out.write_all(b"\n")?;
        Ok(())
    })
}

/// Writes a new version of `path` through `fill` and atomically swaps it in.
pub(crate) fn replace_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = tmp_path(path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    fill(&mut out)?;
    out.flush()?;
    drop(out);

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Removes `path`; a missing file is not an error.
pub(crate) fn remove(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_document_is_default() {
        let tmp = TempDir::new().unwrap();
        let doc: BTreeMap<String, u32> = read_or_default(&tmp.path().join("none.json")).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.json");

        let mut doc = BTreeMap::new();
        doc.insert("a".to_string(), 1u32);
        write(&path, &doc, true).unwrap();

        let back: BTreeMap<String, u32> = read_or_default(&path).unwrap();
        assert_eq!(back, doc);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let res: Result<BTreeMap<String, u32>> = read_or_default(&path);
        assert!(res.is_err());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(!remove(&tmp.path().join("gone")).unwrap());
    }
}

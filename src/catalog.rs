//! Persistent registry of table name to [Schema].
//!
//! The whole catalog is one JSON document. Every call re-reads it, and every
//! mutation rewrites it in full, so two handles on the same directory always
//! agree with each other.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::document;
use crate::error::{EngineError, Result};
use crate::table::Schema;

const CATALOG_FILE: &str = "catalog.json";

type Tables = BTreeMap<String, Schema>;

#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    pretty: bool,
}

impl Catalog {
    /// Opens the catalog in `config.data_dir`, creating an empty one if none
    /// exists yet.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let catalog = Self {
            path: config.data_dir.join(CATALOG_FILE),
            pretty: config.pretty_documents,
        };
        if !catalog.path.exists() {
            catalog.save(&Tables::new())?;
        }
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Tables> {
        document::read_or_default(&self.path)
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        debug!(tables = tables.len(), "rewriting catalog");
        document::write(&self.path, tables, self.pretty)
    }

    /// Registers a new table.
    ///
    /// # Errors
    /// Returns [EngineError::AlreadyExists] if `name` is already registered.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<()> {
        let mut tables = self.load()?;
        if tables.contains_key(name) {
            return Err(EngineError::AlreadyExists(format!(
                "table '{name}' already exists"
            )));
        }
        tables.insert(name.to_string(), schema);
        self.save(&tables)?;
        info!(table = name, "table created");
        Ok(())
    }

    /// Removes a table from the registry.
    ///
    /// # Errors
    /// Returns [EngineError::NotFound] if `name` is not registered.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self.load()?;
        if tables.remove(name).is_none() {
            return Err(EngineError::table_not_found(name));
        }
        self.save(&tables)?;
        info!(table = name, "table dropped");
        Ok(())
    }

    /// Table names in the order the document yields them (sorted).
    pub fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }

    /// Looks up a schema. A missing table is `Ok(None)`, not an error.
    pub fn get_schema(&self, name: &str) -> Result<Option<Schema>> {
        Ok(self.load()?.remove(name))
    }

    /// Every registered table with its schema.
    pub fn schemas(&self) -> Result<BTreeMap<String, Schema>> {
        self.load()
    }
}

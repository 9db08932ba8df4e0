//! Table registry for managing table metadata

use crate::error::{Result, StorageError};
use crate::storage::frame::{self, FrameOptions};
use crate::types::{ColumnDef, IndexDef, TableSchema};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CATALOG_FILE_NAME: &str = "catalog.bin";

/// Table registry metadata (persisted to disk)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryMetadata {
    /// Table name -> TableSchema
    tables: HashMap<String, TableSchema>,
    /// Index name -> (table_name, column_name)
    index_map: HashMap<String, (String, String)>,
}

/// Table registry for managing table schemas and index bindings
pub struct TableRegistry {
    /// Metadata
    metadata: RwLock<RegistryMetadata>,
    /// Persistence file path
    persist_path: PathBuf,
    options: FrameOptions,
}

impl TableRegistry {
    /// Create a new table registry, loading `catalog.bin` if present
    pub fn new<P: AsRef<Path>>(data_dir: P, options: FrameOptions) -> Result<Self> {
        let persist_path = data_dir.as_ref().join(CATALOG_FILE_NAME);

        if let Some(parent) = persist_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let metadata = if persist_path.exists() {
            let mut meta: RegistryMetadata = frame::read_frame(&persist_path, &options)?;

            // Rebuild column maps after deserialization
            for schema in meta.tables.values_mut() {
                schema.rebuild_column_map();
            }

            meta
        } else {
            RegistryMetadata::default()
        };

        log::debug!(
            "catalog loaded from {:?}: {} tables",
            persist_path,
            metadata.tables.len()
        );

        Ok(Self {
            metadata: RwLock::new(metadata),
            persist_path,
            options,
        })
    }

    /// Register a new table. Index bindings are added separately through
    /// `create_index`; any `indexes` on the schema are discarded.
    pub fn create_table(&self, mut schema: TableSchema) -> Result<()> {
        schema.validate()?;

        let mut meta = self.metadata.write();
        if meta.tables.contains_key(&schema.name) {
            return Err(StorageError::TableExist(schema.name));
        }

        schema.indexes.clear();
        schema.rebuild_column_map();
        meta.tables.insert(schema.name.clone(), schema);

        self.persist(&meta)
    }

    /// Drop a table and every index bound to it, returning its schema
    pub fn drop_table(&self, table_name: &str) -> Result<TableSchema> {
        let mut meta = self.metadata.write();

        let schema = meta
            .tables
            .remove(table_name)
            .ok_or_else(|| StorageError::TableNotExist(table_name.to_string()))?;

        for index in &schema.indexes {
            meta.index_map.remove(&index.name);
        }

        self.persist(&meta)?;
        Ok(schema)
    }

    /// Get table schema (the table's attribute list)
    pub fn get_table(&self, table_name: &str) -> Result<TableSchema> {
        self.metadata
            .read()
            .tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| StorageError::TableNotExist(table_name.to_string()))
    }

    /// Get one column of a table
    pub fn get_column(&self, table_name: &str, column_name: &str) -> Result<ColumnDef> {
        let meta = self.metadata.read();
        let schema = meta
            .tables
            .get(table_name)
            .ok_or_else(|| StorageError::TableNotExist(table_name.to_string()))?;
        schema.require_column(column_name).cloned()
    }

    /// List all tables
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metadata.read().tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if table exists
    pub fn table_exists(&self, table_name: &str) -> bool {
        self.metadata.read().tables.contains_key(table_name)
    }

    /// Bind a new index to `table.column`
    pub fn create_index(
        &self,
        table_name: &str,
        index_name: &str,
        column_name: &str,
    ) -> Result<IndexDef> {
        let mut meta = self.metadata.write();

        let table = meta
            .tables
            .get(table_name)
            .ok_or_else(|| StorageError::TableNotExist(table_name.to_string()))?;
        table.require_column(column_name)?;
        if let Some(existing) = table.index_on(column_name) {
            return Err(StorageError::IndexExist(existing.name.clone()));
        }
        if meta.index_map.contains_key(index_name) {
            return Err(StorageError::IndexExist(index_name.to_string()));
        }

        let index = IndexDef::new(index_name, table_name, column_name);
        meta.index_map.insert(
            index_name.to_string(),
            (table_name.to_string(), column_name.to_string()),
        );
        if let Some(table) = meta.tables.get_mut(table_name) {
            table.add_index(index.clone());
        }

        self.persist(&meta)?;
        Ok(index)
    }

    /// Column an index of `table_name` is bound to
    pub fn index_to_attribute(&self, table_name: &str, index_name: &str) -> Result<String> {
        let meta = self.metadata.read();
        if !meta.tables.contains_key(table_name) {
            return Err(StorageError::TableNotExist(table_name.to_string()));
        }

        match meta.index_map.get(index_name) {
            Some((table, column)) if table == table_name => Ok(column.clone()),
            _ => Err(StorageError::IndexNotExist(index_name.to_string())),
        }
    }

    /// Remove an index binding
    pub fn drop_index(&self, table_name: &str, index_name: &str) -> Result<IndexDef> {
        let mut meta = self.metadata.write();

        match meta.index_map.get(index_name) {
            Some((table, _)) if table == table_name => {}
            _ if !meta.tables.contains_key(table_name) => {
                return Err(StorageError::TableNotExist(table_name.to_string()))
            }
            _ => return Err(StorageError::IndexNotExist(index_name.to_string())),
        }
        meta.index_map.remove(index_name);

        let table = meta
            .tables
            .get_mut(table_name)
            .ok_or_else(|| StorageError::TableNotExist(table_name.to_string()))?;
        let pos = table
            .indexes
            .iter()
            .position(|idx| idx.name == index_name)
            .ok_or_else(|| StorageError::IndexNotExist(index_name.to_string()))?;
        let index = table.indexes.remove(pos);

        self.persist(&meta)?;
        Ok(index)
    }

    /// Get index definition
    pub fn get_index(&self, index_name: &str) -> Result<IndexDef> {
        let meta = self.metadata.read();

        let (table_name, _) = meta
            .index_map
            .get(index_name)
            .ok_or_else(|| StorageError::IndexNotExist(index_name.to_string()))?;

        meta.tables
            .get(table_name)
            .and_then(|table| table.indexes.iter().find(|idx| idx.name == index_name))
            .cloned()
            .ok_or_else(|| StorageError::IndexNotExist(index_name.to_string()))
    }

    /// Persist metadata to disk
    fn persist(&self, meta: &RegistryMetadata) -> Result<()> {
        frame::write_frame(&self.persist_path, meta, &self.options)
    }
}

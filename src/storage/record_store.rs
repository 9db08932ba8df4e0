//! Record store: one heap file per table
//!
//! A heap file holds every live tuple of a table keyed by a row id assigned in
//! insertion order, so a full scan returns tuples in storage order. Scans with a
//! predicate on an indexed attribute go through the [`IndexManager`]; all other
//! scans filter the heap. Index files bound to the table are kept in step with
//! every insert and delete.

use crate::catalog::TableRegistry;
use crate::index::IndexManager;
use crate::storage::frame::{self, FrameOptions};
use crate::types::{IndexDef, RowId, Table, TableSchema, Tuple, Where};
use crate::{Result, StorageError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of every table heap file
pub const TABLE_FILE_PREFIX: &str = "TABLE_FILE_";

pub fn table_file_name(table_name: &str) -> String {
    format!("{}{}", TABLE_FILE_PREFIX, table_name)
}

/// On-disk contents of one table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HeapFile {
    next_row_id: RowId,
    rows: BTreeMap<RowId, Tuple>,
}

/// Physical tuple storage
pub struct RecordStore {
    dir: PathBuf,
    catalog: Arc<TableRegistry>,
    indexes: Arc<IndexManager>,
    options: FrameOptions,
    /// Serializes read-modify-write cycles on heap files
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new<P: AsRef<Path>>(
        dir: P,
        catalog: Arc<TableRegistry>,
        indexes: Arc<IndexManager>,
        options: FrameOptions,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            catalog,
            indexes,
            options,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, table_name: &str) -> PathBuf {
        self.dir.join(table_file_name(table_name))
    }

    pub fn table_file_exists(&self, table_name: &str) -> bool {
        self.path(table_name).exists()
    }

    fn load(&self, table_name: &str) -> Result<HeapFile> {
        let path = self.path(table_name);
        if !path.exists() {
            return Err(StorageError::TableNotExist(table_name.to_string()));
        }
        frame::read_frame(&path, &self.options)
    }

    fn store(&self, table_name: &str, heap: &HeapFile) -> Result<()> {
        frame::write_frame(&self.path(table_name), heap, &self.options)
    }

    // ==================== Table files ====================

    /// Create an empty heap file
    pub fn create_table_file(&self, table_name: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.table_file_exists(table_name) {
            return Err(StorageError::TableExist(table_name.to_string()));
        }
        self.store(table_name, &HeapFile::default())
    }

    /// Delete a heap file with all of its records
    pub fn drop_table_file(&self, table_name: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let path = self.path(table_name);
        if !path.exists() {
            return Err(StorageError::TableNotExist(table_name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    // ==================== Scans ====================

    /// Full scan in storage order
    pub fn select_all(&self, table_name: &str) -> Result<Table> {
        let schema = self.catalog.get_table(table_name)?;
        let heap = self.load(table_name)?;
        Ok(Table::new(schema, heap.rows.into_values().collect()))
    }

    /// Tuples satisfying one predicate, in storage order
    pub fn select_where(&self, table_name: &str, predicate: &Where) -> Result<Table> {
        let schema = self.catalog.get_table(table_name)?;
        let mut heap = self.load(table_name)?;
        let row_ids = self.matching_rows(&schema, &heap, predicate)?;

        let tuples = row_ids
            .into_iter()
            .filter_map(|id| heap.rows.remove(&id))
            .collect();
        Ok(Table::new(schema, tuples))
    }

    /// Row ids matching `predicate`, ascending
    fn matching_rows(
        &self,
        schema: &TableSchema,
        heap: &HeapFile,
        predicate: &Where,
    ) -> Result<Vec<RowId>> {
        let column = schema.require_column(&predicate.attribute)?;
        predicate.check_type(column.col_type)?;

        if let Some(index) = schema.index_on(&column.name) {
            let file_id = index.file_name();
            if self.indexes.exists(&file_id) {
                log::debug!("{}: index scan on {} for {}", schema.name, file_id, predicate);
                return self.indexes.search(&file_id, predicate.relation, &predicate.value);
            }
            log::warn!(
                "{}: index file {} missing, falling back to heap scan",
                schema.name,
                file_id
            );
        }

        let pos = column.position;
        log::debug!("{}: heap scan for {}", schema.name, predicate);
        Ok(heap
            .rows
            .iter()
            .filter(|(_, tuple)| tuple.get(pos).is_some_and(|v| predicate.matches(v)))
            .map(|(id, _)| *id)
            .collect())
    }

    /// Bound indexes whose file is present. A missing file is skipped the same
    /// way scans skip it.
    fn live_indexes<'a>(&self, schema: &'a TableSchema) -> Vec<&'a IndexDef> {
        schema
            .indexes
            .iter()
            .filter(|index| {
                let present = self.indexes.exists(&index.file_name());
                if !present {
                    log::warn!(
                        "{}: index file {} missing, not maintained",
                        schema.name,
                        index.file_name()
                    );
                }
                present
            })
            .collect()
    }

    // ==================== Mutations ====================

    /// Insert a tuple after type and uniqueness checks
    pub fn insert_record(&self, table_name: &str, tuple: Tuple) -> Result<RowId> {
        let _guard = self.write_lock.lock();
        let schema = self.catalog.get_table(table_name)?;
        schema.validate_tuple(tuple.values())?;
        let mut heap = self.load(table_name)?;

        for col in &schema.columns {
            if !schema.is_unique(col.position) {
                continue;
            }
            let value = &tuple.values()[col.position];
            let taken = match schema.index_on(&col.name) {
                Some(index) if self.indexes.exists(&index.file_name()) => {
                    self.indexes.contains_key(&index.file_name(), value)?
                }
                _ => heap.rows.values().any(|t| t.get(col.position) == Some(value)),
            };
            if taken {
                let table = table_name.to_string();
                let attribute = col.name.clone();
                return Err(if col.position == schema.primary_key {
                    StorageError::PrimaryKeyConflict { table, attribute }
                } else {
                    StorageError::UniqueConflict { table, attribute }
                });
            }
        }

        let row_id = heap.next_row_id;
        heap.next_row_id += 1;
        heap.rows.insert(row_id, tuple.clone());
        self.store(table_name, &heap)?;

        for index in self.live_indexes(&schema) {
            let pos = schema.require_column(&index.column_name)?.position;
            let entry = (tuple.values()[pos].clone(), row_id);
            self.indexes.insert_entries(&index.file_name(), &[entry])?;
        }

        Ok(row_id)
    }

    /// Delete every record, keeping the table file. Returns the count removed.
    pub fn delete_all(&self, table_name: &str) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let schema = self.catalog.get_table(table_name)?;
        let mut heap = self.load(table_name)?;

        let removed = heap.rows.len();
        heap.rows.clear();
        self.store(table_name, &heap)?;

        for index in self.live_indexes(&schema) {
            self.indexes.clear(&index.file_name())?;
        }
        Ok(removed)
    }

    /// Delete records satisfying one predicate. Returns the count removed.
    pub fn delete_where(&self, table_name: &str, predicate: &Where) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let schema = self.catalog.get_table(table_name)?;
        let mut heap = self.load(table_name)?;
        let row_ids = self.matching_rows(&schema, &heap, predicate)?;

        let removed: Vec<(RowId, Tuple)> = row_ids
            .into_iter()
            .filter_map(|id| heap.rows.remove(&id).map(|t| (id, t)))
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }
        self.store(table_name, &heap)?;

        for index in self.live_indexes(&schema) {
            let pos = schema.require_column(&index.column_name)?.position;
            let entries: Vec<_> = removed
                .iter()
                .map(|(id, t)| (t.values()[pos].clone(), *id))
                .collect();
            self.indexes.remove_entries(&index.file_name(), &entries)?;
        }
        Ok(removed.len())
    }

    /// Load the existing records of `table_name` into a freshly created index
    pub fn bind_index(&self, table_name: &str, index_name: &str) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let index = self.catalog.get_index(index_name)?;
        if index.table_name != table_name {
            return Err(StorageError::IndexNotExist(index_name.to_string()));
        }
        let schema = self.catalog.get_table(table_name)?;
        let pos = schema.require_column(&index.column_name)?.position;
        let heap = self.load(table_name)?;

        let entries: Vec<_> = heap
            .rows
            .iter()
            .map(|(id, t)| (t.values()[pos].clone(), *id))
            .collect();
        self.indexes.insert_entries(&index.file_name(), &entries)?;
        Ok(entries.len())
    }
}

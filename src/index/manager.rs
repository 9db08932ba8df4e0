//! Index manager for per-attribute index files
//!
//! Each index is one ordered file mapping key → row ids, named by
//! [`index_file_name`](super::index_file_name). Files are read per call and
//! rewritten atomically on every mutation.

use crate::storage::frame::{self, FrameOptions};
use crate::types::{ColumnType, Relation, RowId, Value};
use crate::{Result, StorageError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// On-disk contents of one index file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexFile {
    #[serde(with = "key_tag")]
    key_type: ColumnType,
    entries: BTreeMap<Value, BTreeSet<RowId>>,
}

impl IndexFile {
    fn check_key(&self, file_id: &str, key: &Value) -> Result<()> {
        if self.key_type.accepts(key) {
            Ok(())
        } else {
            Err(StorageError::DataTypeConflict {
                attribute: file_id.to_string(),
                expected: self.key_type.to_string(),
                found: key.type_name().to_string(),
            })
        }
    }

    fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }
}

/// Key types are stored as their integer tag
mod key_tag {
    use crate::types::ColumnType;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key_type: &ColumnType, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i32(key_type.tag())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ColumnType, D::Error> {
        let tag = i32::deserialize(d)?;
        ColumnType::from_tag(tag).map_err(de::Error::custom)
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub key_type: ColumnType,
    pub distinct_keys: usize,
    pub total_entries: usize,
}

/// Manages the index files of one database directory
pub struct IndexManager {
    dir: PathBuf,
    options: FrameOptions,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl IndexManager {
    pub fn new<P: AsRef<Path>>(dir: P, options: FrameOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            options,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, file_id: &str) -> PathBuf {
        self.dir.join(file_id)
    }

    pub fn exists(&self, file_id: &str) -> bool {
        self.path(file_id).exists()
    }

    fn load(&self, file_id: &str) -> Result<IndexFile> {
        let path = self.path(file_id);
        if !path.exists() {
            return Err(StorageError::IndexNotExist(file_id.to_string()));
        }
        frame::read_frame(&path, &self.options)
    }

    fn store(&self, file_id: &str, index: &IndexFile) -> Result<()> {
        frame::write_frame(&self.path(file_id), index, &self.options)
    }

    /// Create an empty index file keyed by `key_type`
    pub fn create_index(&self, file_id: &str, key_type: ColumnType) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.exists(file_id) {
            return Err(StorageError::IndexExist(file_id.to_string()));
        }

        let index = IndexFile {
            key_type,
            entries: BTreeMap::new(),
        };
        self.store(file_id, &index)?;
        log::debug!("index file {} created (key type {})", file_id, key_type);
        Ok(())
    }

    /// Remove an index file; `key_type` must match the type it was created with
    pub fn drop_index(&self, file_id: &str, key_type: ColumnType) -> Result<()> {
        let _guard = self.write_lock.lock();
        let index = self.load(file_id)?;
        if index.key_type != key_type {
            return Err(StorageError::InvalidArgument(format!(
                "Index {} has key type {}, not {}",
                file_id, index.key_type, key_type
            )));
        }

        fs::remove_file(self.path(file_id))?;
        log::debug!("index file {} dropped", file_id);
        Ok(())
    }

    /// Add (key, row id) pairs
    pub fn insert_entries(&self, file_id: &str, entries: &[(Value, RowId)]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut index = self.load(file_id)?;
        for (key, _) in entries {
            index.check_key(file_id, key)?;
        }
        for (key, row_id) in entries {
            index.entries.entry(key.clone()).or_default().insert(*row_id);
        }
        self.store(file_id, &index)
    }

    /// Remove (key, row id) pairs; pairs not present are ignored
    pub fn remove_entries(&self, file_id: &str, entries: &[(Value, RowId)]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut index = self.load(file_id)?;
        for (key, row_id) in entries {
            if let Some(rows) = index.entries.get_mut(key) {
                rows.remove(row_id);
                if rows.is_empty() {
                    index.entries.remove(key);
                }
            }
        }
        self.store(file_id, &index)
    }

    /// Remove every entry, keeping the file
    pub fn clear(&self, file_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut index = self.load(file_id)?;
        index.entries.clear();
        self.store(file_id, &index)
    }

    /// Row ids whose key satisfies `key <relation> value`, ascending
    pub fn search(&self, file_id: &str, relation: Relation, value: &Value) -> Result<Vec<RowId>> {
        let index = self.load(file_id)?;
        index.check_key(file_id, value)?;

        let mut rows: Vec<RowId> = match relation {
            Relation::Eq => index
                .entries
                .get(value)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
            Relation::Ne => index
                .entries
                .iter()
                .filter(|(k, _)| *k != value)
                .flat_map(|(_, set)| set.iter().copied())
                .collect(),
            range => {
                let bounds: (Bound<&Value>, Bound<&Value>) = match range {
                    Relation::Lt => (Bound::Unbounded, Bound::Excluded(value)),
                    Relation::Le => (Bound::Unbounded, Bound::Included(value)),
                    Relation::Gt => (Bound::Excluded(value), Bound::Unbounded),
                    _ => (Bound::Included(value), Bound::Unbounded),
                };
                index
                    .entries
                    .range::<Value, _>(bounds)
                    .flat_map(|(_, set)| set.iter().copied())
                    .collect()
            }
        };
        rows.sort_unstable();
        Ok(rows)
    }

    /// Whether any row holds `key`
    pub fn contains_key(&self, file_id: &str, key: &Value) -> Result<bool> {
        let index = self.load(file_id)?;
        index.check_key(file_id, key)?;
        Ok(index.entries.contains_key(key))
    }

    pub fn stats(&self, file_id: &str) -> Result<IndexStats> {
        let index = self.load(file_id)?;
        Ok(IndexStats {
            key_type: index.key_type,
            distinct_keys: index.entries.len(),
            total_entries: index.len(),
        })
    }
}

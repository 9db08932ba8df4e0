//! minidb Public API
//!
//! 查询协调层：所有公开操作都从 [`Database`] 进入，再路由到三个协作者：
//! - **Catalog** ([`TableRegistry`]): 表结构、主键位置、索引绑定
//! - **RecordStore** ([`RecordStore`]): 每张表一个 heap 文件
//! - **IndexManager** ([`IndexManager`]): 每个 (表, 属性) 一个索引文件
//!
//! 多条件查询时取回两个部分结果，再按 AND（交集）或 OR（并集）合并。

use crate::catalog::TableRegistry;
use crate::config::{DBConfig, CONFIG_FILE_NAME};
use crate::index::{index_file_name, IndexManager};
use crate::query::{merge_tables, Selection};
use crate::storage::{FrameOptions, RecordStore};
use crate::types::{ColumnDef, IndexSpec, LogicOp, Table, TableSchema, Tuple, Where};
use crate::{Result, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// minidb 数据库实例（查询协调器）
///
/// # 快速开始
///
/// ```no_run
/// use minidb::types::{ColumnDef, ColumnType, LogicOp, Where};
/// use minidb::{tuple, Database};
///
/// let db = Database::open("data.minidb")?;
/// db.create_table(
///     "users",
///     vec![
///         ColumnDef::new("id", ColumnType::Integer, 0),
///         ColumnDef::new("name", ColumnType::Char(16), 1),
///     ],
///     0,
///     vec![],
/// )?;
/// db.insert_record("users", tuple![1i64, "a"])?;
/// db.insert_record("users", tuple![2i64, "b"])?;
///
/// let both = db.select_record(
///     "users",
///     vec![Where::equals("id", 1i64), Where::equals("id", 2i64)],
///     LogicOp::Or,
/// )?;
/// assert_eq!(both.len(), 2);
/// # Ok::<(), minidb::StorageError>(())
/// ```
///
/// Every call runs to completion synchronously. Collaborators serialize their
/// own file updates, but no isolation spans multiple calls.
pub struct Database {
    path: PathBuf,
    config: DBConfig,
    catalog: Arc<TableRegistry>,
    records: Arc<RecordStore>,
    indexes: Arc<IndexManager>,
}

impl Database {
    // ============================================================================
    // 1. 数据库生命周期管理
    // ============================================================================

    /// Open (or create) a database directory.
    ///
    /// Reads `config.json` inside the directory when present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref().join(CONFIG_FILE_NAME);
        let config = if config_path.exists() {
            DBConfig::load(&config_path)?
        } else {
            DBConfig::default()
        };
        Self::open_with_config(path, config)
    }

    /// Open (or create) a database directory with an explicit configuration
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: DBConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        let options = FrameOptions::from(&config);
        let catalog = Arc::new(TableRegistry::new(&path, options)?);
        let indexes = Arc::new(IndexManager::new(path.join("indexes"), options)?);
        let records = Arc::new(RecordStore::new(
            path.join("tables"),
            catalog.clone(),
            indexes.clone(),
            options,
        )?);

        log::info!(
            "opened database at {:?} ({}, {} tables)",
            path,
            config.durability.description(),
            catalog.list_tables().len()
        );

        Ok(Self {
            path,
            config,
            catalog,
            records,
            indexes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &DBConfig {
        &self.config
    }

    // ============================================================================
    // 2. 查询
    // ============================================================================

    /// Select tuples of `table_name` matching up to two predicates.
    ///
    /// - no predicate: every tuple, in storage order
    /// - one predicate: matching tuples, in storage order
    /// - two predicates: each scanned against its own attribute, then merged;
    ///   `LogicOp::And` intersects, `LogicOp::Or` unions without duplicates.
    ///   The result is in sorted tuple order.
    ///
    /// More than two predicates fail with `InvalidPredicateCount`.
    pub fn select_record(
        &self,
        table_name: &str,
        predicates: Vec<Where>,
        op: LogicOp,
    ) -> Result<Table> {
        let selection = Selection::from_predicates(predicates, op)?;
        self.select(table_name, &selection)
    }

    /// Select with an already-shaped [`Selection`]
    pub fn select(&self, table_name: &str, selection: &Selection) -> Result<Table> {
        log::debug!(
            "{}: selection with {} predicate(s)",
            table_name,
            selection.predicate_count()
        );
        match selection {
            Selection::All => self.records.select_all(table_name),
            Selection::Single(predicate) => self.records.select_where(table_name, predicate),
            Selection::Combined { left, right, op } => {
                let table1 = self.records.select_where(table_name, left)?;
                let table2 = self.records.select_where(table_name, right)?;
                log::debug!(
                    "{}: merging {} ({} tuples) {:?} {} ({} tuples)",
                    table_name,
                    left,
                    table1.len(),
                    op,
                    right,
                    table2.len()
                );
                Ok(merge_tables(table1, table2, *op))
            }
        }
    }

    // ============================================================================
    // 3. 记录增删
    // ============================================================================

    /// Insert one tuple
    pub fn insert_record(&self, table_name: &str, tuple: Tuple) -> Result<()> {
        self.records.insert_record(table_name, tuple)?;
        Ok(())
    }

    /// Delete records; `None` deletes every row but keeps the table.
    /// Returns the number of rows removed.
    pub fn delete_record(&self, table_name: &str, predicate: Option<Where>) -> Result<usize> {
        match predicate {
            None => self.records.delete_all(table_name),
            Some(predicate) => self.records.delete_where(table_name, &predicate),
        }
    }

    // ============================================================================
    // 4. 表管理
    // ============================================================================

    /// Create a table with `columns`, primary key at `primary`, and the
    /// requested indexes.
    ///
    /// With `auto_primary_key_index` a `<table>_pk_idx` index is created on the
    /// primary key unless `index_spec` already covers it.
    ///
    /// Every index is checked before any file is written, and a table whose
    /// index step still fails is dropped again, so an error leaves no table
    /// behind.
    pub fn create_table(
        &self,
        table_name: &str,
        columns: Vec<ColumnDef>,
        primary: usize,
        index_spec: Vec<IndexSpec>,
    ) -> Result<()> {
        let schema = TableSchema::new(table_name, columns, primary);
        schema.validate()?;
        let specs = self.plan_indexes(&schema, index_spec)?;

        self.records.create_table_file(table_name)?;
        if let Err(e) = self.catalog.create_table(schema) {
            if let Err(cleanup) = self.records.drop_table_file(table_name) {
                log::warn!(
                    "{}: could not remove heap file after failed create: {}",
                    table_name,
                    cleanup
                );
            }
            return Err(e);
        }
        log::info!("table {} created", table_name);

        for spec in &specs {
            if let Err(e) = self.create_index(table_name, &spec.name, &spec.column) {
                log::warn!("{}: index {} failed, dropping table: {}", table_name, spec.name, e);
                if let Err(cleanup) = self.drop_table(table_name) {
                    log::warn!("{}: rollback of table failed: {}", table_name, cleanup);
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Indexes to build for a new table, checked against the schema, the
    /// catalog and the index files already on disk
    fn plan_indexes(
        &self,
        schema: &TableSchema,
        index_spec: Vec<IndexSpec>,
    ) -> Result<Vec<IndexSpec>> {
        let mut specs = index_spec;
        let pk_column = &schema.primary_key_column().name;
        if self.config.auto_primary_key_index && !specs.iter().any(|s| &s.column == pk_column) {
            let name = format!("{}_pk_idx", schema.name);
            specs.insert(0, IndexSpec::new(name, pk_column.clone()));
        }

        for (i, spec) in specs.iter().enumerate() {
            schema.require_column(&spec.column)?;
            let earlier = &specs[..i];
            if earlier.iter().any(|s| s.name == spec.name || s.column == spec.column)
                || self.catalog.get_index(&spec.name).is_ok()
            {
                return Err(StorageError::IndexExist(spec.name.clone()));
            }
            // Distinct (table, attribute) pairs can share a file id
            let file_id = index_file_name(&schema.name, &spec.column);
            if self.indexes.exists(&file_id) {
                return Err(StorageError::IndexExist(file_id));
            }
        }

        Ok(specs)
    }

    /// Drop a table with its records and indexes.
    ///
    /// Not atomic: a failure after the heap file is removed leaves the
    /// remaining steps undone.
    pub fn drop_table(&self, table_name: &str) -> Result<()> {
        let schema = self.catalog.get_table(table_name)?;

        self.records.drop_table_file(table_name)?;
        for index in &schema.indexes {
            let col_type = schema.require_column(&index.column_name)?.col_type;
            match self.indexes.drop_index(&index.file_name(), col_type) {
                Ok(()) | Err(StorageError::IndexNotExist(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.catalog.drop_table(table_name)?;

        log::info!("table {} dropped", table_name);
        Ok(())
    }

    pub fn table_schema(&self, table_name: &str) -> Result<TableSchema> {
        self.catalog.get_table(table_name)
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.list_tables()
    }

    pub fn has_table(&self, table_name: &str) -> bool {
        self.catalog.table_exists(table_name)
    }

    // ============================================================================
    // 5. 索引管理
    // ============================================================================

    /// Create index `index_name` on `table_name.attribute` and load existing rows.
    ///
    /// Later-step failures undo the earlier steps: an index file that cannot
    /// be created removes the catalog entry, and a failed load removes both.
    pub fn create_index(&self, table_name: &str, index_name: &str, attribute: &str) -> Result<()> {
        self.catalog.create_index(table_name, index_name, attribute)?;

        let col_type = match self.catalog.get_column(table_name, attribute) {
            Ok(column) => column.col_type,
            Err(e) => {
                self.undo_catalog_index(table_name, index_name);
                return Err(e);
            }
        };
        let file_id = index_file_name(table_name, attribute);

        if let Err(e) = self.indexes.create_index(&file_id, col_type) {
            self.undo_catalog_index(table_name, index_name);
            return Err(e);
        }

        match self.records.bind_index(table_name, index_name) {
            Ok(loaded) => {
                log::info!(
                    "index {} created on {}.{} (key tag {}, {} rows)",
                    index_name,
                    table_name,
                    attribute,
                    col_type.tag(),
                    loaded
                );
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = self.indexes.drop_index(&file_id, col_type) {
                    log::warn!("rollback of index file {} failed: {}", file_id, cleanup);
                }
                self.undo_catalog_index(table_name, index_name);
                Err(e)
            }
        }
    }

    fn undo_catalog_index(&self, table_name: &str, index_name: &str) {
        log::warn!("rolling back catalog entry for index {}", index_name);
        if let Err(e) = self.catalog.drop_index(table_name, index_name) {
            log::warn!("rollback of catalog index {} failed: {}", index_name, e);
        }
    }

    /// Drop index `index_name` of `table_name`.
    ///
    /// Not atomic: the index file is removed before the catalog entry. A binding
    /// whose file is already gone is still removed from the catalog.
    pub fn drop_index(&self, table_name: &str, index_name: &str) -> Result<()> {
        let attribute = self.catalog.index_to_attribute(table_name, index_name)?;
        let col_type = self.catalog.get_column(table_name, &attribute)?.col_type;
        let file_id = index_file_name(table_name, &attribute);

        match self.indexes.drop_index(&file_id, col_type) {
            Ok(()) => {}
            Err(StorageError::IndexNotExist(_)) => {
                log::warn!("index file {} already missing, removing binding only", file_id);
            }
            Err(e) => return Err(e),
        }
        self.catalog.drop_index(table_name, index_name)?;

        log::info!("index {} dropped from {}.{}", index_name, table_name, attribute);
        Ok(())
    }
}

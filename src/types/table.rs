//! Table metadata and schema definitions

use crate::types::Value;
use crate::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Longest declarable text column, in bytes
pub const MAX_CHAR_LENGTH: u16 = 255;

/// Column data type
///
/// Persisted and handed to the index layer as an integer tag: `-1` integer,
/// `0` float, any positive `n` text of at most `n` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Integer
    Integer,
    /// Float
    Float,
    /// Text with a maximum byte length
    Char(u16),
}

impl ColumnType {
    pub const INTEGER_TAG: i32 = -1;
    pub const FLOAT_TAG: i32 = 0;

    pub fn tag(&self) -> i32 {
        match self {
            ColumnType::Integer => Self::INTEGER_TAG,
            ColumnType::Float => Self::FLOAT_TAG,
            ColumnType::Char(len) => i32::from(*len),
        }
    }

    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            Self::INTEGER_TAG => Ok(ColumnType::Integer),
            Self::FLOAT_TAG => Ok(ColumnType::Float),
            n if n > 0 && n <= i32::from(MAX_CHAR_LENGTH) => Ok(ColumnType::Char(n as u16)),
            other => Err(StorageError::InvalidArgument(format!(
                "Invalid column type tag {}",
                other
            ))),
        }
    }

    /// Whether a value has the variant this column stores (length not checked)
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnType::Integer, Value::Integer(_))
                | (ColumnType::Float, Value::Float(_))
                | (ColumnType::Char(_), Value::Text(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Char(len) => write!(f, "CHAR({})", len),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column data type
    pub col_type: ColumnType,
    /// Position in Tuple (0-indexed)
    pub position: usize,
    /// Whether values must be distinct across the table
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: ColumnType, position: usize) -> Self {
        Self {
            name: name.into(),
            col_type,
            position,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name (must be unique in database)
    pub name: String,
    /// Table name
    pub table_name: String,
    /// Column name
    pub column_name: String,
}

impl IndexDef {
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
        }
    }

    /// Identifier of the index file backing this definition
    pub fn file_name(&self) -> String {
        crate::index::index_file_name(&self.table_name, &self.column_name)
    }
}

/// Index requested at table creation: (index name, column name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub column: String,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
        }
    }
}

/// Table schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Column definitions (ordered)
    pub columns: Vec<ColumnDef>,
    /// Position of the primary key column
    pub primary_key: usize,
    /// Index definitions
    pub indexes: Vec<IndexDef>,
    /// Column name -> position mapping
    #[serde(skip)]
    column_map: HashMap<String, usize>,
}

impl PartialEq for TableSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.primary_key == other.primary_key
            && self.indexes == other.indexes
    }
}

impl TableSchema {
    /// Create a new table schema. Column positions are renumbered to their
    /// order in `columns`.
    pub fn new(name: impl Into<String>, mut columns: Vec<ColumnDef>, primary_key: usize) -> Self {
        for (i, col) in columns.iter_mut().enumerate() {
            col.position = i;
        }
        let mut schema = Self {
            name: name.into(),
            columns,
            primary_key,
            indexes: Vec::new(),
            column_map: HashMap::new(),
        };
        schema.rebuild_column_map();
        schema
    }

    /// Structural checks done before a schema is registered
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(StorageError::InvalidArgument(format!(
                "Table '{}' has no columns",
                self.name
            )));
        }
        if self.primary_key >= self.columns.len() {
            return Err(StorageError::InvalidArgument(format!(
                "Primary key position {} out of range for table '{}'",
                self.primary_key, self.name
            )));
        }
        if self.column_map.len() != self.columns.len() {
            return Err(StorageError::InvalidArgument(format!(
                "Duplicate column name in table '{}'",
                self.name
            )));
        }
        for col in &self.columns {
            if let ColumnType::Char(len) = col.col_type {
                if len == 0 || len > MAX_CHAR_LENGTH {
                    return Err(StorageError::InvalidArgument(format!(
                        "Column '{}' has invalid length {}",
                        col.name, len
                    )));
                }
            }
        }
        Ok(())
    }

    /// Get primary key column
    pub fn primary_key_column(&self) -> &ColumnDef {
        &self.columns[self.primary_key]
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.get_column_position(name).map(|pos| &self.columns[pos])
    }

    /// Get column position by name
    pub fn get_column_position(&self, name: &str) -> Option<usize> {
        self.column_map.get(name).copied()
    }

    /// Column lookup that reports `AttributeNotExist`
    pub fn require_column(&self, name: &str) -> Result<&ColumnDef> {
        self.get_column(name)
            .ok_or_else(|| StorageError::attribute_not_exist(&self.name, name))
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether a column must hold distinct values
    pub fn is_unique(&self, position: usize) -> bool {
        position == self.primary_key || self.columns[position].unique
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: IndexDef) {
        self.indexes.push(index);
    }

    /// Index bound to a column, if any
    pub fn index_on(&self, column: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|idx| idx.column_name == column)
    }

    /// Rebuild column map (call after deserialization)
    pub fn rebuild_column_map(&mut self) {
        self.column_map.clear();
        for col in &self.columns {
            self.column_map.insert(col.name.clone(), col.position);
        }
    }

    /// Validate a tuple against this schema
    pub fn validate_tuple(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(StorageError::TupleTypeConflict(format!(
                "Column count mismatch: expected {}, got {}",
                self.columns.len(),
                values.len()
            )));
        }

        for (col, value) in self.columns.iter().zip(values) {
            if !col.col_type.accepts(value) {
                return Err(StorageError::TupleTypeConflict(format!(
                    "Type mismatch for column '{}': expected {}, got {}",
                    col.name,
                    col.col_type,
                    value.type_name()
                )));
            }
            if let (ColumnType::Char(len), Value::Text(s)) = (col.col_type, value) {
                if s.len() > usize::from(len) {
                    return Err(StorageError::TupleTypeConflict(format!(
                        "Value for column '{}' exceeds {} bytes",
                        col.name, len
                    )));
                }
            }
        }

        Ok(())
    }
}

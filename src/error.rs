//! Error types for the minidb coordinator and its collaborators

use crate::storage::frame::FrameError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Table '{0}' does not exist")]
    TableNotExist(String),

    #[error("Table '{0}' already exists")]
    TableExist(String),

    #[error("Attribute '{attribute}' does not exist in table '{table}'")]
    AttributeNotExist { table: String, attribute: String },

    #[error("Data type conflict on '{attribute}': expected {expected}, got {found}")]
    DataTypeConflict {
        attribute: String,
        expected: String,
        found: String,
    },

    #[error("Tuple type conflict: {0}")]
    TupleTypeConflict(String),

    #[error("Primary key conflict on '{attribute}' in table '{table}'")]
    PrimaryKeyConflict { table: String, attribute: String },

    #[error("Unique conflict on '{attribute}' in table '{table}'")]
    UniqueConflict { table: String, attribute: String },

    #[error("Index '{0}' already exists")]
    IndexExist(String),

    #[error("Index '{0}' does not exist")]
    IndexNotExist(String),

    #[error("Predicate count must be 0, 1 or 2, got {0}")]
    InvalidPredicateCount(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Fieldless error category, for callers that only branch on the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TableNotExist,
    TableExist,
    AttributeNotExist,
    DataTypeConflict,
    TupleTypeConflict,
    PrimaryKeyConflict,
    UniqueConflict,
    IndexExist,
    IndexNotExist,
    InvalidPredicateCount,
    Io,
    Serialization,
    Corruption,
    InvalidArgument,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TableNotExist(_) => ErrorKind::TableNotExist,
            Self::TableExist(_) => ErrorKind::TableExist,
            Self::AttributeNotExist { .. } => ErrorKind::AttributeNotExist,
            Self::DataTypeConflict { .. } => ErrorKind::DataTypeConflict,
            Self::TupleTypeConflict(_) => ErrorKind::TupleTypeConflict,
            Self::PrimaryKeyConflict { .. } => ErrorKind::PrimaryKeyConflict,
            Self::UniqueConflict { .. } => ErrorKind::UniqueConflict,
            Self::IndexExist(_) => ErrorKind::IndexExist,
            Self::IndexNotExist(_) => ErrorKind::IndexNotExist,
            Self::InvalidPredicateCount(_) => ErrorKind::InvalidPredicateCount,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Corruption(_) => ErrorKind::Corruption,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn attribute_not_exist(table: &str, attribute: &str) -> Self {
        Self::AttributeNotExist {
            table: table.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<FrameError> for StorageError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::PayloadTooLarge(_) => StorageError::InvalidArgument(err.to_string()),
            _ => StorageError::Corruption(err.to_string()),
        }
    }
}

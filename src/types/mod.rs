//! Data types for minidb

mod predicate;
mod table;

pub use predicate::{LogicOp, Relation, Where};
pub use table::{ColumnDef, ColumnType, IndexDef, IndexSpec, TableSchema, MAX_CHAR_LENGTH};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Row identifier (unique within a table, assigned in insertion order)
pub type RowId = u64;

/// A single attribute value
///
/// `Value` is totally ordered: same-variant values compare numerically
/// (floats by IEEE total order) or lexicographically, and different variants
/// compare by rank `Integer < Float < Text`. Equality is "ordering says
/// Equal", so `Eq` and `Ord` never disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text string
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Float(_) => 1,
            Value::Text(_) => 2,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Fixed-arity ordered sequence of values, aligned with a table's columns
///
/// Ordering is lexicographic over the values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.0.get(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Build a tuple from heterogeneous literals: `tuple![1i64, "a"]`
#[macro_export]
macro_rules! tuple {
    ($($v:expr),* $(,)?) => {
        $crate::types::Tuple::new(vec![$($crate::types::Value::from($v)),*])
    };
}

/// A named, schema-bound sequence of tuples (query result or stored relation)
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    schema: TableSchema,
    tuples: Vec<Tuple>,
}

impl Table {
    pub fn new(schema: TableSchema, tuples: Vec<Tuple>) -> Self {
        Self {
            name: schema.name.clone(),
            schema,
            tuples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub(crate) fn into_parts(self) -> (TableSchema, Vec<Tuple>) {
        (self.schema, self.tuples)
    }
}

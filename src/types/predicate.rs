//! Single-attribute predicates and the boolean operator joining two of them

use crate::types::{ColumnType, Value};
use crate::{Result, StorageError};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    /// Does `ordering` (stored value compared to the predicate value) satisfy this relation
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Relation::Eq => ordering == Ordering::Equal,
            Relation::Ne => ordering != Ordering::Equal,
            Relation::Lt => ordering == Ordering::Less,
            Relation::Le => ordering != Ordering::Greater,
            Relation::Gt => ordering == Ordering::Greater,
            Relation::Ge => ordering != Ordering::Less,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Ne => "<>",
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
        }
    }
}

/// One predicate: `attribute <relation> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    pub attribute: String,
    pub relation: Relation,
    pub value: Value,
}

impl Where {
    pub fn new(attribute: impl Into<String>, relation: Relation, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            relation,
            value: value.into(),
        }
    }

    /// `attribute = value`
    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Relation::Eq, value)
    }

    /// Reject a comparison value whose type differs from the column's
    pub fn check_type(&self, col_type: ColumnType) -> Result<()> {
        if col_type.accepts(&self.value) {
            Ok(())
        } else {
            Err(StorageError::DataTypeConflict {
                attribute: self.attribute.clone(),
                expected: col_type.to_string(),
                found: self.value.type_name().to_string(),
            })
        }
    }

    /// Evaluate against a stored value of the same column
    pub fn matches(&self, stored: &Value) -> bool {
        self.relation.holds(stored.cmp(&self.value))
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.relation.symbol(), self.value)
    }
}

/// Boolean operator joining two predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// Intersection of both partial results
    And,
    /// Union of both partial results
    Or,
}

impl From<bool> for LogicOp {
    /// `true` (nonzero) means AND, `false` means OR
    fn from(and: bool) -> Self {
        if and {
            LogicOp::And
        } else {
            LogicOp::Or
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_holds() {
        let w = Where::new("age", Relation::Ge, 18i64);
        assert!(w.matches(&Value::Integer(18)));
        assert!(w.matches(&Value::Integer(40)));
        assert!(!w.matches(&Value::Integer(17)));

        let w = Where::new("name", Relation::Ne, "bob");
        assert!(w.matches(&Value::from("alice")));
        assert!(!w.matches(&Value::from("bob")));

        let w = Where::new("score", Relation::Lt, 0.5);
        assert!(w.matches(&Value::Float(0.25)));
        assert!(!w.matches(&Value::Float(0.5)));
    }

    #[test]
    fn test_check_type() {
        let w = Where::equals("id", "1");
        let err = w.check_type(ColumnType::Integer).unwrap_err();
        assert!(matches!(err, StorageError::DataTypeConflict { .. }));
        assert!(Where::equals("id", 1i64).check_type(ColumnType::Integer).is_ok());
        assert!(Where::equals("name", "x").check_type(ColumnType::Char(4)).is_ok());
        // no int -> float coercion
        assert!(Where::equals("score", 1i64).check_type(ColumnType::Float).is_err());
    }

    #[test]
    fn test_logic_op_from_bool() {
        assert_eq!(LogicOp::from(true), LogicOp::And);
        assert_eq!(LogicOp::from(false), LogicOp::Or);
    }
}

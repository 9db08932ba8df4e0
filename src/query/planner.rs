//! Selection planning: turns a predicate list into a legal selection shape

use crate::types::{LogicOp, Where};
use crate::{Result, StorageError};

/// What a selection scans for
///
/// Only the shapes the merge engine supports are representable.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Every tuple, in storage order
    All,
    /// Tuples matching one predicate, in storage order
    Single(Where),
    /// Two predicate scans merged by `op`, in sorted tuple order
    Combined {
        left: Where,
        right: Where,
        op: LogicOp,
    },
}

impl Selection {
    /// Build from a predicate list: 0 → `All`, 1 → `Single`, 2 → `Combined`.
    /// `op` is only consulted for two predicates.
    pub fn from_predicates(predicates: Vec<Where>, op: LogicOp) -> Result<Self> {
        let count = predicates.len();
        let mut iter = predicates.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (None, _, _) => Ok(Selection::All),
            (Some(only), None, _) => Ok(Selection::Single(only)),
            (Some(left), Some(right), None) => Ok(Selection::Combined { left, right, op }),
            _ => Err(StorageError::InvalidPredicateCount(count)),
        }
    }

    pub fn and(left: Where, right: Where) -> Self {
        Selection::Combined {
            left,
            right,
            op: LogicOp::And,
        }
    }

    pub fn or(left: Where, right: Where) -> Self {
        Selection::Combined {
            left,
            right,
            op: LogicOp::Or,
        }
    }

    pub fn predicate_count(&self) -> usize {
        match self {
            Selection::All => 0,
            Selection::Single(_) => 1,
            Selection::Combined { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_predicates() {
        assert_eq!(
            Selection::from_predicates(vec![], LogicOp::And).unwrap(),
            Selection::All
        );

        let single =
            Selection::from_predicates(vec![Where::equals("id", 1i64)], LogicOp::Or).unwrap();
        assert_eq!(single, Selection::Single(Where::equals("id", 1i64)));

        let pair = Selection::from_predicates(
            vec![Where::equals("id", 1i64), Where::equals("id", 2i64)],
            LogicOp::Or,
        )
        .unwrap();
        assert_eq!(pair, Selection::or(Where::equals("id", 1i64), Where::equals("id", 2i64)));
        assert_eq!(pair.predicate_count(), 2);
    }

    #[test]
    fn test_too_many_predicates_rejected() {
        let preds = vec![
            Where::equals("a", 1i64),
            Where::equals("b", 2i64),
            Where::equals("c", 3i64),
        ];
        let err = Selection::from_predicates(preds, LogicOp::And).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPredicateCount(3)));
    }
}

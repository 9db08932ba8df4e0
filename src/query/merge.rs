//! Set union / intersection of two partial results
//!
//! Both sides are sorted by the full-tuple lexicographic order and
//! de-duplicated, then walked once with a sorted merge. The same comparator
//! drives sorting, de-duplication and the merge decisions, so two tuples are
//! "the same tuple" exactly when the sort puts them at the same position.

use crate::types::{LogicOp, Table, Tuple};
use std::cmp::Ordering;

/// Combine two partial tables. The result takes the first table's name and schema.
pub fn merge_tables(left: Table, right: Table, op: LogicOp) -> Table {
    match op {
        LogicOp::And => intersect_tables(left, right),
        LogicOp::Or => union_tables(left, right),
    }
}

/// Tuples present in either table, each once, in sorted order
pub fn union_tables(left: Table, right: Table) -> Table {
    let (schema, left) = left.into_parts();
    let merged = union(left, right.into_tuples());
    Table::new(schema, merged)
}

/// Tuples present in both tables, each once, in sorted order
pub fn intersect_tables(left: Table, right: Table) -> Table {
    let (schema, left) = left.into_parts();
    let merged = intersect(left, right.into_tuples());
    Table::new(schema, merged)
}

fn sorted_distinct(mut tuples: Vec<Tuple>) -> Vec<Tuple> {
    tuples.sort_unstable();
    tuples.dedup();
    tuples
}

fn union(left: Vec<Tuple>, right: Vec<Tuple>) -> Vec<Tuple> {
    let left = sorted_distinct(left);
    let right = sorted_distinct(right);
    let mut out = Vec::with_capacity(left.len() + right.len());

    let mut l = left.into_iter().peekable();
    let mut r = right.into_iter().peekable();
    loop {
        let ord = match (l.peek(), r.peek()) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match ord {
            Ordering::Less => out.extend(l.next()),
            Ordering::Greater => out.extend(r.next()),
            Ordering::Equal => {
                out.extend(l.next());
                r.next();
            }
        }
    }

    log::debug!("union merged into {} tuples", out.len());
    out
}

fn intersect(left: Vec<Tuple>, right: Vec<Tuple>) -> Vec<Tuple> {
    let left = sorted_distinct(left);
    let right = sorted_distinct(right);
    let mut out = Vec::with_capacity(left.len().min(right.len()));

    let mut l = left.into_iter().peekable();
    let mut r = right.into_iter().peekable();
    loop {
        let ord = match (l.peek(), r.peek()) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => break,
        };
        match ord {
            Ordering::Less => {
                l.next();
            }
            Ordering::Greater => {
                r.next();
            }
            Ordering::Equal => {
                out.extend(l.next());
                r.next();
            }
        }
    }

    log::debug!("intersection kept {} tuples", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple;
    use crate::types::{ColumnDef, ColumnType, TableSchema};

    fn table(name: &str, tuples: Vec<Tuple>) -> Table {
        let schema = TableSchema::new(
            name,
            vec![
                ColumnDef::new("id", ColumnType::Integer, 0),
                ColumnDef::new("name", ColumnType::Char(8), 1),
            ],
            0,
        );
        Table::new(schema, tuples)
    }

    fn contains(t: &Table, tuple: &Tuple) -> bool {
        t.tuples().iter().any(|x| x == tuple)
    }

    #[test]
    fn test_union_membership_and_no_duplicates() {
        let a = table("a", vec![tuple![3i64, "c"], tuple![1i64, "a"], tuple![1i64, "a"]]);
        let b = table("b", vec![tuple![2i64, "b"], tuple![3i64, "c"]]);

        let u = union_tables(a.clone(), b.clone());
        assert_eq!(u.name(), "a");
        assert_eq!(
            u.tuples(),
            &[tuple![1i64, "a"], tuple![2i64, "b"], tuple![3i64, "c"]]
        );
        for t in a.tuples().iter().chain(b.tuples()) {
            assert!(contains(&u, t));
        }
    }

    #[test]
    fn test_intersection_membership() {
        let a = table("a", vec![tuple![1i64, "a"], tuple![2i64, "b"], tuple![3i64, "c"]]);
        let b = table("b", vec![tuple![3i64, "c"], tuple![4i64, "d"], tuple![2i64, "b"]]);

        let i = intersect_tables(a, b);
        assert_eq!(i.tuples(), &[tuple![2i64, "b"], tuple![3i64, "c"]]);
    }

    #[test]
    fn test_commutative_up_to_order() {
        let a = table("a", vec![tuple![5i64, "e"], tuple![1i64, "a"], tuple![2i64, "b"]]);
        let b = table("a", vec![tuple![2i64, "b"], tuple![9i64, "z"]]);

        assert_eq!(
            union_tables(a.clone(), b.clone()).tuples(),
            union_tables(b.clone(), a.clone()).tuples()
        );
        assert_eq!(
            intersect_tables(a.clone(), b.clone()).tuples(),
            intersect_tables(b, a).tuples()
        );
    }

    #[test]
    fn test_self_intersection_is_dedup() {
        let a = table(
            "a",
            vec![tuple![2i64, "b"], tuple![1i64, "a"], tuple![2i64, "b"], tuple![1i64, "a"]],
        );
        let i = intersect_tables(a.clone(), a);
        assert_eq!(i.tuples(), &[tuple![1i64, "a"], tuple![2i64, "b"]]);
    }

    #[test]
    fn test_shared_first_field_differing_tail() {
        // Same first field, different second field: distinct tuples
        let a = table("a", vec![tuple![1i64, "x"], tuple![1i64, "z"]]);
        let b = table("b", vec![tuple![1i64, "y"], tuple![1i64, "x"]]);

        let u = union_tables(a.clone(), b.clone());
        assert_eq!(
            u.tuples(),
            &[tuple![1i64, "x"], tuple![1i64, "y"], tuple![1i64, "z"]]
        );

        let i = intersect_tables(a, b);
        assert_eq!(i.tuples(), &[tuple![1i64, "x"]]);
    }

    #[test]
    fn test_empty_sides() {
        let a = table("a", vec![tuple![1i64, "a"]]);
        let empty = table("e", vec![]);

        assert_eq!(union_tables(empty.clone(), a.clone()).tuples(), a.tuples());
        assert_eq!(union_tables(a.clone(), empty.clone()).tuples(), a.tuples());
        assert!(intersect_tables(a.clone(), empty.clone()).is_empty());
        assert!(merge_tables(empty.clone(), empty, LogicOp::Or).is_empty());
        assert_eq!(merge_tables(a.clone(), a.clone(), LogicOp::And).tuples(), a.tuples());
    }
}

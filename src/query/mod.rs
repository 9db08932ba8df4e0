//! Query execution layer

mod merge;
mod planner;

pub use merge::{intersect_tables, merge_tables, union_tables};
pub use planner::Selection;

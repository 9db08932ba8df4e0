//! Index layer implementation
//!
//! Provides ordered single-attribute indexes backed by one file each

mod manager;

pub use manager::{IndexManager, IndexStats};

/// Prefix of every index file identifier
pub const INDEX_FILE_PREFIX: &str = "INDEX_FILE_";

/// Deterministic index file identifier: `INDEX_FILE_<attribute>_<table>`
pub fn index_file_name(table_name: &str, attribute: &str) -> String {
    format!("{}{}_{}", INDEX_FILE_PREFIX, attribute, table_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_file_name() {
        assert_eq!(index_file_name("users", "id"), "INDEX_FILE_id_users");
        assert_eq!(index_file_name("t", "a_b"), "INDEX_FILE_a_b_t");
    }
}

//! Storage layer implementation
//!
//! Manages physical tuple storage as one checksummed heap file per table

pub mod frame;
pub mod record_store;

pub use frame::{FrameError, FrameOptions};
pub use record_store::{table_file_name, RecordStore, TABLE_FILE_PREFIX};

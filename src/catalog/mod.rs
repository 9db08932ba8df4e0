//! Catalog: table schemas and index bindings

mod registry;

pub use registry::{TableRegistry, CATALOG_FILE_NAME};

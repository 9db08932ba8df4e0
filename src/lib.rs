//! minidb Storage Engine
//!
//! 面向教学场景的最小关系型存储的查询协调层
//!
//! ## 核心特性
//! - INT / FLOAT / CHAR(n) 三种列类型
//! - 主键与 UNIQUE 约束
//! - 单属性有序索引
//! - 最多两个条件的选择，按 AND（交集）或 OR（并集）合并
//!
//! ## 架构
//! - 目录层: 表结构与索引绑定 (catalog.bin)
//! - 存储层: 每表一个带校验的 heap 文件 (tables/)
//! - 索引层: 每个 (表, 属性) 一个有序索引文件 (indexes/)
//! - 查询层: 选择分解 + 有序归并

pub mod config;
pub mod storage;
pub mod index;
pub mod query;
pub mod types;
pub mod catalog;

mod error;
mod api;

pub use config::{DBConfig, DurabilityLevel};
pub use error::{ErrorKind, Result, StorageError};

pub use api::Database;
pub use catalog::TableRegistry;
pub use query::Selection;
pub use types::{
    ColumnDef, ColumnType, IndexSpec, LogicOp, Relation, Table, TableSchema, Tuple, Value, Where,
};

//! Database configuration and durability levels
//!
//! Provides the knobs for balancing write safety against speed, plus
//! JSON load/save so a database directory can carry its own `config.json`.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up by `Database::open` inside the database directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 持久性级别（Durability Level）
///
/// 在数据安全性和写入性能之间做权衡：
/// - Synchronous: 每次写入后 fsync，再原子重命名
/// - NoSync: 只写入 OS 缓冲区，仅用于测试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurabilityLevel {
    /// 同步模式：每次写入立即 fsync（最安全）
    Synchronous,

    /// 不刷盘：崩溃时可能丢失最近一次写入（仅测试）
    NoSync,
}

impl Default for DurabilityLevel {
    fn default() -> Self {
        DurabilityLevel::Synchronous
    }
}

impl DurabilityLevel {
    /// 判断是否需要立即刷盘
    pub fn requires_immediate_sync(&self) -> bool {
        matches!(self, Self::Synchronous)
    }

    /// 获取人类可读的描述
    pub fn description(&self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous (fsync per write)",
            Self::NoSync => "no sync (testing only)",
        }
    }
}

/// Storage and coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DBConfig {
    /// Durability of every persisted file (catalog, tables, indexes)
    pub durability: DurabilityLevel,

    /// Verify CRC32 of every frame on read
    pub checksum: bool,

    /// Snappy-compress frames on write (reads accept both forms)
    pub compression: bool,

    /// Create `<table>_pk_idx` on the primary key when a table is created
    pub auto_primary_key_index: bool,
}

impl Default for DBConfig {
    fn default() -> Self {
        Self {
            durability: DurabilityLevel::default(),
            checksum: true,
            compression: false,
            auto_primary_key_index: true,
        }
    }
}

impl DBConfig {
    /// 最安全配置：fsync + 校验 + 压缩
    pub fn for_durability() -> Self {
        Self {
            durability: DurabilityLevel::Synchronous,
            compression: true,
            ..Default::default()
        }
    }

    /// 测试配置：不刷盘
    pub fn for_testing() -> Self {
        Self {
            durability: DurabilityLevel::NoSync,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path.as_ref(), data)?;
        Ok(())
    }
}

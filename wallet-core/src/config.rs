//! Configuration for the wallet core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wallet core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Writer mailbox capacity (bounded channel, backpressure)
    pub mailbox_capacity: usize,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/wallet"),
            service_name: "wallet-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 1000,
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            target_file_size_mb: 64,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("WALLET_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(capacity) = std::env::var("WALLET_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid mailbox capacity: {}", e)))?;
        }

        Ok(config)
    }
}

//! Configuration for the ledger core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Metrics listen address
    pub metrics_listen_addr: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Role classes and privileged identities
    pub authority: AuthorityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            service_name: "supply-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_listen_addr: "0.0.0.0:9090".to_string(),
            rocksdb: RocksDBConfig::default(),
            authority: AuthorityConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

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
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Identity classes used by authorization checks
///
/// Producer classes are recognised by identity prefix; the payment authority
/// is a single exact identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Identity allowed to mint, burn and set the cancel compensation
    pub payment_authority: String,

    /// Prefix marking material producers
    pub material_producer_prefix: String,

    /// Prefix marking product producers
    pub product_producer_prefix: String,

    /// Compensation percentage used until one is set on the ledger
    pub default_cancel_compensate: u8,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            payment_authority: "payment".to_string(),
            material_producer_prefix: "material.".to_string(),
            product_producer_prefix: "product.".to_string(),
            default_cancel_compensate: 0,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) {
        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("LEDGER_METRICS_ADDR") {
            self.metrics_listen_addr = addr;
        }

        if let Ok(authority) = std::env::var("LEDGER_PAYMENT_AUTHORITY") {
            self.authority.payment_authority = authority;
        }
    }

    /// Reject configurations the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.metrics_listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::Error::Config(format!(
                "metrics_listen_addr is not a socket address: {:?}",
                self.metrics_listen_addr
            )));
        }

        let authority = &self.authority;
        if authority.payment_authority.is_empty() {
            return Err(crate::Error::Config("payment_authority is empty".to_string()));
        }
        if authority.material_producer_prefix.is_empty()
            || authority.product_producer_prefix.is_empty()
        {
            return Err(crate::Error::Config("producer prefixes must be non-empty".to_string()));
        }
        if authority.default_cancel_compensate > 100 {
            return Err(crate::Error::Config(format!(
                "default_cancel_compensate must be 0-100, got {}",
                authority.default_cancel_compensate
            )));
        }
        Ok(())
    }
}

//! Configuration for the settlement host

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Settlement host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Ledger core configuration (data dir, roles, RocksDB tuning)
    pub ledger: supply_ledger_core::Config,

    /// State store backend
    pub backend: Backend,

    /// Host actor configuration
    pub host: HostConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "supply-settlement".to_string(),
            ledger: supply_ledger_core::Config::default(),
            backend: Backend::default(),
            host: HostConfig::default(),
        }
    }
}

/// State store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Ordered in-memory map; state is lost on exit
    Memory,
    /// RocksDB under `ledger.data_dir`
    #[default]
    RocksDb,
}

impl FromStr for Backend {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "rocksdb" => Ok(Backend::RocksDb),
            other => Err(crate::Error::Config(format!("unknown backend {:?}", other))),
        }
    }
}

/// Host actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Bounded mailbox size; senders wait when it is full
    pub mailbox_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
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
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        self.ledger.apply_env();

        if let Ok(backend) = std::env::var("SETTLEMENT_BACKEND") {
            self.backend = backend.parse()?;
        }

        if let Ok(capacity) = std::env::var("SETTLEMENT_MAILBOX_CAPACITY") {
            self.host.mailbox_capacity = capacity.parse().map_err(|_| {
                crate::Error::Config(format!("invalid mailbox capacity {:?}", capacity))
            })?;
        }

        Ok(())
    }

    /// Reject configurations the host cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.mailbox_capacity == 0 {
            return Err(crate::Error::Config("mailbox_capacity must be positive".to_string()));
        }
        self.ledger.validate()?;
        Ok(())
    }
}

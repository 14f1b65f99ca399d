//! # Node Configuration
//!
//! Loaded from a TOML file, then overridden from the environment:
//!
//! | Variable          | Field                      |
//! |-------------------|----------------------------|
//! | `DFL_P2P_PORT`    | `network.p2p_port`         |
//! | `DFL_PEERS`       | `network.peers` (comma-separated `host:port`) |
//! | `DFL_DATA_DIR`    | `ledger.data_dir`          |
//! | `DFL_PRIVATE_KEY` | `identity.private_key`     |
//!
//! ```toml
//! [network]
//! p2p_port = 8000
//! peers = ["10.0.0.2:8000", "10.0.0.3:8000"]
//!
//! [ledger]
//! block_size = 10
//! confirmation_quota = 2
//!
//! [identity]
//! private_key = "…64 hex chars…"
//! address = "…64 hex chars…"
//! ```

use dfl_06_block_manager::CreatorPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {variable}: {value}")]
    InvalidOverride { variable: String, value: String },
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub ledger: LedgerConfig,
    pub identity: IdentityConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface the gossip server binds to.
    pub listen_host: String,
    pub p2p_port: u16,
    /// Initial peers as `host:port`.
    pub peers: Vec<String>,
    pub max_peers: usize,
    /// Bound on each phase of an outbound request.
    pub rpc_timeout_secs: u64,
    /// Idle limit for an inbound connection.
    pub read_timeout_secs: u64,
    pub max_connections: usize,
    /// Threads handling accepted gossip.
    pub worker_threads: usize,
    /// Queued jobs before inbound gossip is refused.
    pub worker_queue: usize,
    /// Queued outbound messages before new gossip is dropped.
    pub outbox_capacity: usize,
    /// Broadcasts in flight at once.
    pub max_inflight_broadcasts: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            p2p_port: 8000,
            peers: Vec::new(),
            max_peers: 10,
            rpc_timeout_secs: 10,
            read_timeout_secs: 10,
            max_connections: 256,
            worker_threads: 4,
            worker_queue: 1024,
            outbox_capacity: 1024,
            max_inflight_broadcasts: 16,
        }
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Root directory of the persistent stores.
    pub data_dir: PathBuf,
    /// Content every node agrees on for block 0.
    pub genesis_content: String,
    /// Transactions per model-update batch.
    pub batch_trigger: usize,
    /// Pending arrivals that trigger block generation.
    pub block_size: usize,
    /// Receipts a cached transaction needs before it is eligible for a block.
    pub receipt_threshold: usize,
    /// Confirmations that finalize a block before its window elapses.
    pub confirmation_quota: usize,
    pub confirmation_window_secs: u64,
    pub creator_policy: CreatorPolicy,
    /// Period of the block ticker.
    pub tick_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            genesis_content: "dfl-genesis".to_string(),
            batch_trigger: 10,
            block_size: 10,
            receipt_threshold: 1,
            confirmation_quota: 1,
            confirmation_window_secs: 60,
            creator_policy: CreatorPolicy::FirstTransactionCreator,
            tick_ms: 1_000,
        }
    }
}

impl LedgerConfig {
    pub fn block_store_path(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }

    pub fn block_cache_path(&self) -> PathBuf {
        self.data_dir.join("block_cache")
    }

    pub fn verified_path(&self) -> PathBuf {
        self.data_dir.join("verified")
    }
}

/// Node key material. A missing private key means a fresh key per run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub private_key: Option<String>,
    /// Expected address; checked against the one derived from the key.
    pub address: Option<String>,
}

impl NodeConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `DFL_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("DFL_P2P_PORT") {
            self.network.p2p_port =
                port.parse().map_err(|_| ConfigError::InvalidOverride {
                    variable: "DFL_P2P_PORT".to_string(),
                    value: port.clone(),
                })?;
        }
        if let Some(peers) = lookup("DFL_PEERS") {
            self.network.peers = peers
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(dir) = lookup("DFL_DATA_DIR") {
            self.ledger.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup("DFL_PRIVATE_KEY") {
            self.identity.private_key = Some(key);
        }
        Ok(self)
    }
}

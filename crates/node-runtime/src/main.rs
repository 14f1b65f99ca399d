//! # Ledger Node
//!
//! ```text
//! dfl-node [config.toml]
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use node_runtime::adapters::LoggingAggregator;
use node_runtime::runtime::{load_keys, NodeRuntime};
use node_runtime::NodeConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = NodeConfig::load(config_path.as_deref())
        .and_then(NodeConfig::with_env_overrides)
        .context("failed to load configuration")?;

    let keys = load_keys(&config.identity).context("failed to load node keys")?;
    let runtime = NodeRuntime::start(config, keys, Arc::new(LoggingAggregator::new())).await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await
}

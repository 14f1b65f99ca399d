//! # Ledger Node Runtime
//!
//! This library exposes the node's wiring for the binary and for the
//! workspace integration tests. The entry point is `main.rs`.
//!
//! ## Modular Structure
//!
//! - `config` - `NodeConfig` from TOML plus `DFL_*` overrides
//! - `adapters/` - storage backends and the model-update aggregator
//! - `ledger` - `LedgerNode`, the pipeline behind the gossip transport
//! - `runtime` - `NodeRuntime`, which opens everything and owns the tasks
//!
//! ## Pipeline
//!
//! ```text
//!  peer ──TRANSACTION──▶ GossipTransport ──verify──▶ LedgerNode::on_transaction
//!                                                        │
//!                ┌───────────────────────────────────────┼──────────────────┐
//!                ↓                                       ↓                  ↓
//!        TransactionCache                     BatchAccumulator        own receipt
//!        (pending size ≥ block size)          → ModelAggregator       → verified log
//!                │                                                    → re-broadcast
//!                ↓
//!        dump → BlockManager::generate_block ──BLOCK──▶ peers
//!                                                        │
//!  peers ──BLOCK_CONFIRMATION──▶ append_confirmation ◀───┘
//!                │
//!                ↓ quota reached or window elapsed
//!            finalize → KeyValueStore
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then env)
//! 2. Load keys and run the sign/verify self-check
//! 3. Open stores, install or verify genesis
//! 4. Bind the gossip server, start the broadcaster and block ticker
//! 5. Wait for Ctrl-C, then drain the open block and flush

pub mod adapters;
pub mod config;
pub mod ledger;
pub mod runtime;

pub use config::{ConfigError, IdentityConfig, LedgerConfig, NetworkConfig, NodeConfig};
pub use ledger::{run_block_ticker, run_broadcaster, LedgerNode, NodeError, Outbound};
pub use runtime::{load_keys, NodeRuntime};

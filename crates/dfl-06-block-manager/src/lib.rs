//! # Block Manager (DFL-06)
//!
//! Builds one candidate block at a time from cached transactions, collects
//! confirmations for the receipts it embeds, then finalizes it onto the
//! hash chain.
//!
//! ## State Machine
//!
//! ```text
//!            generate_block(txs)
//!   NoBlock ─────────────────────▶ Building(block)
//!      ▲                              │  append_confirmation (repeat)
//!      │          store write ok      ▼
//!      └──────────────────────── Finalizing
//!                                     │ store write failed
//!                                     └────────▶ Building(block)
//! ```
//!
//! `Finalizing` only exists while the block is being persisted; no lock is
//! held across that write, and `generate_block` keeps failing with
//! `AlreadyBuilding` until it completes.
//!
//! ## Chain Invariants
//!
//! | Field | Rule |
//! |-------|------|
//! | `height` | previous height + 1; genesis is 0 |
//! | `previous_block_hash` | previous block's `final_hash`; absent in genesis |
//! | `genesis_block_hash` | genesis `final_hash`; absent in genesis |
//! | `block_content_hash` | `sha256(canonical(content))` |
//! | `final_hash` | `sha256(canonical(block without final_hash))` |
//!
//! ## Persistence
//!
//! Finalized blocks are stored under their decimal height (`"0"`, `"1"`, ...).
//! The key `genesis` holds the hex genesis hash. On open, the next height is
//! one past the largest decimal key.

pub mod config;
pub mod domain;
pub mod service;

pub use config::{BlockManagerConfig, CreatorPolicy};
pub use domain::errors::{BlockManagerError, ConfirmationRejection};
pub use domain::genesis::build_genesis_block;
pub use domain::state::BlockManagerState;
pub use service::BlockManager;

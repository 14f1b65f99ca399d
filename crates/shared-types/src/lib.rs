//! # Shared Types Crate
//!
//! Ledger entities and the ports every `dfl-*` crate depends on.
//!
//! ## Contents
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `entities` | `NodeIdentity`, `Transaction`, `TransactionReceipt`, `BlockConfirmation`, `Block` |
//! | `canonical` | Deterministic byte encoding used as hash/sign input |
//! | `store` | `KeyValueStore` port + `InMemoryKVStore` |
//! | `time` | `TimeSource` port |
//! | `worker_pool` | Bounded worker pool for downstream processing |
//!
//! ## Integrity Chain
//!
//! ```text
//! TransactionContent --sha256--> Transaction.hash --ecdsa--> Transaction.signature
//!        ReceiptContent --sha256--> Receipt.hash --ecdsa--> Receipt.signature
//!          BlockContent --sha256--> Block.block_content_hash
//!     Block (sans final) --sha256--> Block.final_hash ---> next.previous_block_hash
//! ```
//!
//! ## Design Principles
//!
//! - **Deterministic encoding**: every map that feeds a hash is a `BTreeMap`.
//! - **Bytes internally, hex at the edges**: digests are `[u8; 32]`; store
//!   keys and log fields use lowercase hex.

pub mod canonical;
pub mod entities;
pub mod errors;
pub mod store;
pub mod time;
pub mod worker_pool;

pub use canonical::{CanonicalEncode, CanonicalWriter};
pub use entities::*;
pub use errors::*;
pub use store::{BatchOperation, InMemoryKVStore, KeyValueStore};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
pub use worker_pool::{Job, WorkerPool};

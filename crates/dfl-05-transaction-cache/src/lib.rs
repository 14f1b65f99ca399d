//! # Transaction/Receipt Cache (DFL-05)
//!
//! Collects relayed transactions until enough receipts have accumulated to
//! put them into a block, and remembers which receipt this node issued for
//! each transaction it verified.
//!
//! ## Stores
//!
//! | Store | Key | Value |
//! |-------|-----|-------|
//! | block cache | hex tx hash | bincode `Transaction` (with merged receipts) |
//! | verified log | hex tx hash | bincode `VerifiedRecord` |
//!
//! ## Merge Rules
//!
//! - unseen, no receipts: insert with receipt counter 0
//! - unseen, with receipts: discard (stale relay of a transaction we never saw fresh)
//! - seen: add receipts not already present, counter += number added
//!
//! ## Dump
//!
//! `dump(threshold)` removes and returns every entry whose counter is at
//! least `threshold`, plus entries with no counter (reloaded from disk after
//! a restart). The pending size is reset to zero afterwards even when
//! entries below the threshold remain; it counts arrivals since the last
//! dump, not entries on disk.

pub mod domain;
pub mod service;

pub use domain::entities::{MergeOutcome, VerifiedCheck, VerifiedRecord};
pub use domain::errors::CacheError;
pub use service::TransactionCache;

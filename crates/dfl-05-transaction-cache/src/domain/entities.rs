//! Cache records and operation outcomes.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{Hash, Signature, TransactionReceipt};

/// What `add_or_merge` did with a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First sighting without receipts; now pending.
    Inserted,
    /// Already pending; `added` new receipts merged.
    Merged { added: usize },
    /// Already pending and every receipt was already known.
    Unchanged,
    /// Never seen fresh but arrived carrying receipts.
    DiscardedStaleRelay,
}

/// The receipt this node issued when it verified a transaction.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedRecord {
    pub transaction_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    pub receipt_hash: Hash,
    pub receipt: TransactionReceipt,
}

/// Result of comparing a transaction against the verified log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedCheck {
    /// Signature matches and the recorded receipt is present unchanged.
    Pass,
    /// No record for this transaction hash.
    NotFound,
    /// Signature differs or the recorded receipt was altered.
    Mismatch,
    /// Signature matches but the recorded receipt is missing.
    ReceiptNotPresent,
}

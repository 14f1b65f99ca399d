//! # Ledger Entities
//!
//! ## Clusters
//!
//! - **Identity**: `NodeIdentity`
//! - **Gossip**: `Transaction`, `TransactionReceipt`
//! - **Chain**: `Block`, `BlockContent`, `BlockConfirmation`
//!
//! Transactions and receipts are immutable once signed, apart from receipts
//! being appended to a transaction's receipt map until the transaction is
//! embedded in a finalized block.

use crate::canonical::{CanonicalEncode, CanonicalWriter};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::BTreeMap;
use std::fmt;

pub use shared_crypto::Hash;

/// A 33-byte compressed secp256k1 public key.
pub type PublicKey = [u8; 33];

/// A 64-byte `r||s` ECDSA signature.
pub type Signature = [u8; 64];

/// Lowercase hex rendering of a digest, used for store keys and logs.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Short hex prefix for log lines.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

// =============================================================================
// IDENTITY
// =============================================================================

/// A node's public identity.
///
/// `address == sha256(public_key)` for every identity that signs anything.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub address: Hash,
    #[serde_as(as = "Bytes")]
    pub public_key: PublicKey,
}

impl NodeIdentity {
    pub fn new(address: Hash, public_key: PublicKey) -> Self {
        Self {
            address,
            public_key,
        }
    }

    /// The all-zero identity carried by the genesis block.
    pub fn unassigned() -> Self {
        Self {
            address: [0u8; 32],
            public_key: [0u8; 33],
        }
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIdentity({})", short_hex(&self.address))
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hash_to_hex(&self.address))
    }
}

impl CanonicalEncode for NodeIdentity {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put_fixed(&self.address).put_fixed(&self.public_key);
    }
}

// =============================================================================
// GOSSIP: TRANSACTIONS AND RECEIPTS
// =============================================================================

/// Signed fields of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContent {
    /// Unix seconds at creation.
    pub creation_time: u64,
    /// Unix seconds after which the transaction is rejected.
    pub expire_time: u64,
    pub creator: NodeIdentity,
    /// Relay hop budget.
    pub ttl: u32,
    /// Opaque model-update bytes.
    pub payload: Vec<u8>,
    /// Opaque metadata (e.g. reported accuracy).
    pub metadata: String,
}

impl CanonicalEncode for TransactionContent {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put_u64(self.creation_time)
            .put_u64(self.expire_time)
            .put(&self.creator)
            .put_u32(self.ttl)
            .put_bytes(&self.payload)
            .put_str(&self.metadata);
    }
}

/// A signed model-update announcement plus the receipts collected while it
/// was relayed.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub content: TransactionContent,
    /// `sha256(canonical(content))`.
    pub hash: Hash,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    /// Keyed by receipt hash.
    pub receipts: BTreeMap<Hash, TransactionReceipt>,
}

impl Transaction {
    /// Smallest TTL seen along the relay path (the transaction's own TTL when
    /// no receipt exists yet).
    pub fn min_receive_ttl(&self) -> u32 {
        self.receipts
            .values()
            .map(|r| r.content.receive_at_ttl)
            .fold(self.content.ttl, u32::min)
    }

    pub fn creator(&self) -> &NodeIdentity {
        &self.content.creator
    }

    pub fn has_receipt(&self, receipt_hash: &Hash) -> bool {
        self.receipts.contains_key(receipt_hash)
    }

    /// Copy of this transaction without any receipts.
    pub fn without_receipts(&self) -> Self {
        Self {
            content: self.content.clone(),
            hash: self.hash,
            signature: self.signature,
            receipts: BTreeMap::new(),
        }
    }
}

impl CanonicalEncode for Transaction {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put(&self.content)
            .put_fixed(&self.hash)
            .put_fixed(&self.signature)
            .put_u64(self.receipts.len() as u64);
        for (key, receipt) in &self.receipts {
            out.put_fixed(key).put(receipt);
        }
    }
}

/// Signed fields of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptContent {
    pub creation_time: u64,
    pub creator: NodeIdentity,
    pub metadata: String,
    /// Hash of the transaction this receipt acknowledges.
    pub transaction_hash: Hash,
    /// TTL remaining when this node relayed the transaction.
    pub receive_at_ttl: u32,
}

impl CanonicalEncode for ReceiptContent {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put_u64(self.creation_time)
            .put(&self.creator)
            .put_str(&self.metadata)
            .put_fixed(&self.transaction_hash)
            .put_u32(self.receive_at_ttl);
    }
}

/// A relaying node's signed acknowledgement of a transaction.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub content: ReceiptContent,
    pub hash: Hash,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl CanonicalEncode for TransactionReceipt {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put(&self.content)
            .put_fixed(&self.hash)
            .put_fixed(&self.signature);
    }
}

// =============================================================================
// CHAIN: CONFIRMATIONS AND BLOCKS
// =============================================================================

/// Co-endorsement of a receipt that is embedded in a candidate block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockConfirmation {
    pub transaction_hash: Hash,
    pub receipt_hash: Hash,
    /// Content hash of the block being confirmed.
    pub block_hash: Hash,
    pub creator: NodeIdentity,
    /// Digest over the four fields above.
    pub final_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl BlockConfirmation {
    /// Digest over everything except `final_hash` and `signature`.
    pub fn compute_final_hash(&self) -> Hash {
        let mut w = CanonicalWriter::new();
        w.put_fixed(&self.transaction_hash)
            .put_fixed(&self.receipt_hash)
            .put_fixed(&self.block_hash)
            .put(&self.creator);
        w.digest()
    }
}

impl CanonicalEncode for BlockConfirmation {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put_fixed(&self.transaction_hash)
            .put_fixed(&self.receipt_hash)
            .put_fixed(&self.block_hash)
            .put(&self.creator)
            .put_fixed(&self.final_hash)
            .put_fixed(&self.signature);
    }
}

/// Fields covered by `Block::block_content_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContent {
    /// `final_hash` of the previous block; absent only for genesis.
    pub previous_block_hash: Option<Hash>,
    pub creator: NodeIdentity,
    /// Keyed by transaction hash.
    pub transactions: BTreeMap<Hash, Transaction>,
    pub block_generated_time: u64,
    /// Fixed bytes agreed by all nodes; empty outside genesis.
    pub genesis_content: Vec<u8>,
    /// `final_hash` of the genesis block; absent in genesis itself.
    pub genesis_block_hash: Option<Hash>,
    pub memo: String,
}

impl CanonicalEncode for BlockContent {
    fn encode_canonical(&self, out: &mut CanonicalWriter) {
        out.put_opt_hash(self.previous_block_hash.as_ref())
            .put(&self.creator)
            .put_u64(self.transactions.len() as u64);
        for (key, tx) in &self.transactions {
            out.put_fixed(key).put(tx);
        }
        out.put_u64(self.block_generated_time)
            .put_bytes(&self.genesis_content)
            .put_opt_hash(self.genesis_block_hash.as_ref())
            .put_str(&self.memo);
    }
}

/// A ledger block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub content: BlockContent,
    /// `sha256(canonical(content))`.
    pub block_content_hash: Hash,
    /// Keyed by confirmation `final_hash`.
    pub confirmations: BTreeMap<Hash, BlockConfirmation>,
    pub block_finalization_time: u64,
    /// Digest over the whole block except this field.
    pub final_hash: Hash,
}

impl Block {
    pub fn compute_content_hash(&self) -> Hash {
        self.content.canonical_digest()
    }

    pub fn compute_final_hash(&self) -> Hash {
        let mut w = CanonicalWriter::new();
        w.put_u64(self.height)
            .put(&self.content)
            .put_fixed(&self.block_content_hash)
            .put_u64(self.confirmations.len() as u64);
        for (key, confirmation) in &self.confirmations {
            w.put_fixed(key).put(confirmation);
        }
        w.put_u64(self.block_finalization_time);
        w.digest()
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

//! Signed object construction with the local node key.

use super::errors::GeneratorError;
use super::keys::NodeKeys;
use super::policy::TimingPolicy;
use shared_types::{
    short_hex, BlockConfirmation, CanonicalEncode, Hash, NodeIdentity, ReceiptContent, TimeSource,
    Transaction, TransactionContent, TransactionReceipt,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Produces transactions, receipts and confirmations signed by this node.
pub struct TransactionGenerator {
    keys: Arc<NodeKeys>,
    time: Arc<dyn TimeSource>,
    policy: TimingPolicy,
}

impl TransactionGenerator {
    pub fn new(keys: Arc<NodeKeys>, time: Arc<dyn TimeSource>, policy: TimingPolicy) -> Self {
        Self { keys, time, policy }
    }

    pub fn identity(&self) -> &NodeIdentity {
        self.keys.identity()
    }

    pub fn policy(&self) -> TimingPolicy {
        self.policy
    }

    /// Wrap a model-update payload in a signed transaction.
    pub fn generate(
        &self,
        payload: Vec<u8>,
        metadata: impl Into<String>,
    ) -> Result<Transaction, GeneratorError> {
        let now = self.time.now();
        let content = TransactionContent {
            creation_time: now,
            expire_time: now + self.policy.expiry_grace_secs,
            creator: self.keys.identity().clone(),
            ttl: self.policy.initial_ttl,
            payload,
            metadata: metadata.into(),
        };
        let hash = content.canonical_digest();
        let signature = self.keys.sign(&hash)?;

        debug!(tx_hash = %short_hex(&hash), "[dfl-02] transaction generated");
        Ok(Transaction {
            content,
            hash,
            signature,
            receipts: BTreeMap::new(),
        })
    }

    /// Sign a receipt for `tx` and insert it into the receipt map.
    ///
    /// The receipt's TTL is one less than the smallest TTL seen so far.
    pub fn append_receipt(
        &self,
        tx: &mut Transaction,
        metadata: impl Into<String>,
    ) -> Result<TransactionReceipt, GeneratorError> {
        let min_ttl = tx.min_receive_ttl();
        let receive_at_ttl = min_ttl
            .checked_sub(1)
            .ok_or(GeneratorError::TtlExpired { min_ttl })?;

        let content = ReceiptContent {
            creation_time: self.time.now(),
            creator: self.keys.identity().clone(),
            metadata: metadata.into(),
            transaction_hash: tx.hash,
            receive_at_ttl,
        };
        let hash = content.canonical_digest();
        let signature = self.keys.sign(&hash)?;
        let receipt = TransactionReceipt {
            content,
            hash,
            signature,
        };

        tx.receipts.insert(hash, receipt.clone());
        debug!(
            tx_hash = %short_hex(&tx.hash),
            receipt_hash = %short_hex(&hash),
            receive_at_ttl,
            "[dfl-02] receipt appended"
        );
        Ok(receipt)
    }

    /// Co-endorse a receipt embedded in the block with content hash `block_hash`.
    pub fn create_confirmation(
        &self,
        block_hash: Hash,
        transaction_hash: Hash,
        receipt_hash: Hash,
    ) -> Result<BlockConfirmation, GeneratorError> {
        let mut confirmation = BlockConfirmation {
            transaction_hash,
            receipt_hash,
            block_hash,
            creator: self.keys.identity().clone(),
            final_hash: [0u8; 32],
            signature: [0u8; 64],
        };
        confirmation.final_hash = confirmation.compute_final_hash();
        confirmation.signature = self.keys.sign(&confirmation.final_hash)?;
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ManualTimeSource;

    fn generator(now: u64) -> TransactionGenerator {
        TransactionGenerator::new(
            Arc::new(NodeKeys::generate()),
            Arc::new(ManualTimeSource::new(now)),
            TimingPolicy::default(),
        )
    }

    #[test]
    fn test_generate_stamps_policy_fields() {
        let tx = generator(1_000).generate(vec![7; 8], "0.87").unwrap();

        assert_eq!(tx.content.creation_time, 1_000);
        assert_eq!(tx.content.expire_time, 1_060);
        assert_eq!(tx.content.ttl, 10);
        assert_eq!(tx.hash, tx.content.canonical_digest());
        assert!(tx.receipts.is_empty());
    }

    #[test]
    fn test_receipt_ttls_strictly_decrease() {
        let creator = generator(1_000);
        let mut tx = creator.generate(vec![1], "").unwrap();

        let mut ttls = Vec::new();
        for _ in 0..3 {
            let relay = generator(1_001);
            ttls.push(relay.append_receipt(&mut tx, "").unwrap().content.receive_at_ttl);
        }

        assert_eq!(ttls, vec![9, 8, 7]);
        assert_eq!(tx.receipts.len(), 3);
    }

    #[test]
    fn test_append_receipt_rejects_exhausted_ttl() {
        let creator = generator(1_000);
        let mut tx = creator.generate(vec![1], "").unwrap();
        tx.content.ttl = 1;

        let relay = generator(1_000);
        relay.append_receipt(&mut tx, "").unwrap();
        let result = relay.append_receipt(&mut tx, "");

        assert_eq!(result, Err(GeneratorError::TtlExpired { min_ttl: 0 }));
        assert_eq!(tx.receipts.len(), 1);
    }

    #[test]
    fn test_confirmation_final_hash_and_creator() {
        let node = generator(1_000);
        let c = node.create_confirmation([1; 32], [2; 32], [3; 32]).unwrap();

        assert_eq!(&c.creator, node.identity());
        assert_eq!(c.final_hash, c.compute_final_hash());
        assert_eq!(c.block_hash, [1; 32]);
    }
}

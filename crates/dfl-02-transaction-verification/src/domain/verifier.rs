//! Peer-supplied object verification.

use super::errors::{ReceiptFault, VerificationError};
use super::policy::TimingPolicy;
use shared_crypto::{sha256, CryptoError, Secp256k1PublicKey, Secp256k1Signature};
use shared_types::{
    hash_to_hex, BlockConfirmation, CanonicalEncode, Hash, NodeIdentity, Signature, TimeSource,
    Transaction, TransactionReceipt,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of the identity + signature check shared by every signed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignerFault {
    AddressMismatch,
    InvalidPublicKey,
    SignatureInvalid,
}

fn check_signer(
    signer: &NodeIdentity,
    digest: &Hash,
    signature: &Signature,
) -> Result<(), SignerFault> {
    if sha256(&signer.public_key) != signer.address {
        return Err(SignerFault::AddressMismatch);
    }
    let key = Secp256k1PublicKey::from_bytes(signer.public_key)
        .map_err(|_| SignerFault::InvalidPublicKey)?;
    key.verify_digest(digest, &Secp256k1Signature::from_bytes(*signature))
        .map_err(|e| match e {
            CryptoError::InvalidPublicKey => SignerFault::InvalidPublicKey,
            _ => SignerFault::SignatureInvalid,
        })
}

impl From<SignerFault> for VerificationError {
    fn from(fault: SignerFault) -> Self {
        match fault {
            SignerFault::AddressMismatch => VerificationError::AddressMismatch,
            SignerFault::InvalidPublicKey => VerificationError::InvalidPublicKey,
            SignerFault::SignatureInvalid => VerificationError::SignatureInvalid,
        }
    }
}

impl From<SignerFault> for ReceiptFault {
    fn from(fault: SignerFault) -> Self {
        match fault {
            SignerFault::AddressMismatch => ReceiptFault::AddressMismatch,
            SignerFault::InvalidPublicKey => ReceiptFault::InvalidPublicKey,
            SignerFault::SignatureInvalid => ReceiptFault::SignatureInvalid,
        }
    }
}

/// Stateless verifier; only reads the clock.
pub struct TransactionVerifier {
    time: Arc<dyn TimeSource>,
    policy: TimingPolicy,
}

impl TransactionVerifier {
    pub fn new(time: Arc<dyn TimeSource>, policy: TimingPolicy) -> Self {
        Self { time, policy }
    }

    /// Run every transaction check in order, stopping at the first failure.
    ///
    /// Receipts form a relay chain, so no two may share a `receive_at_ttl`.
    pub fn verify(&self, tx: &Transaction) -> Result<(), VerificationError> {
        let now = self.time.now();
        let content = &tx.content;

        if content.expire_time < content.creation_time {
            return Err(VerificationError::ExpiresBeforeCreation {
                creation_time: content.creation_time,
                expire_time: content.expire_time,
            });
        }
        if content.creation_time > now.saturating_add(self.policy.clock_skew_secs) {
            return Err(VerificationError::CreatedInFuture {
                creation_time: content.creation_time,
                now,
            });
        }
        if now > content.expire_time {
            return Err(VerificationError::Expired {
                expire_time: content.expire_time,
                now,
            });
        }
        if content.canonical_digest() != tx.hash {
            return Err(VerificationError::HashMismatch);
        }
        check_signer(&content.creator, &tx.hash, &tx.signature)?;

        let mut seen_ttls = BTreeSet::new();
        for receipt in tx.receipts.values() {
            let checked = self.verify_receipt(tx, receipt).and_then(|()| {
                if seen_ttls.insert(receipt.content.receive_at_ttl) {
                    Ok(())
                } else {
                    Err(ReceiptFault::DuplicateReceiveTtl)
                }
            });
            checked.map_err(|fault| VerificationError::ReceiptRejected {
                receipt: hash_to_hex(&receipt.hash),
                fault,
            })?;
        }
        Ok(())
    }

    /// Check one receipt against its parent transaction.
    pub fn verify_receipt(
        &self,
        tx: &Transaction,
        receipt: &TransactionReceipt,
    ) -> Result<(), ReceiptFault> {
        let now = self.time.now();
        let content = &receipt.content;

        if content.creation_time > now.saturating_add(self.policy.clock_skew_secs) {
            return Err(ReceiptFault::CreatedInFuture);
        }
        if content.transaction_hash != tx.hash {
            return Err(ReceiptFault::TransactionHashMismatch);
        }
        if content.receive_at_ttl >= tx.content.ttl {
            return Err(ReceiptFault::TtlOutOfRange);
        }
        if content.canonical_digest() != receipt.hash {
            return Err(ReceiptFault::HashMismatch);
        }
        check_signer(&content.creator, &receipt.hash, &receipt.signature)?;
        Ok(())
    }

    /// Check a confirmation's own hash and signature.
    ///
    /// Whether it matches an open block is decided by the block manager.
    pub fn verify_confirmation(
        &self,
        confirmation: &BlockConfirmation,
    ) -> Result<(), VerificationError> {
        if confirmation.compute_final_hash() != confirmation.final_hash {
            return Err(VerificationError::HashMismatch);
        }
        check_signer(
            &confirmation.creator,
            &confirmation.final_hash,
            &confirmation.signature,
        )?;
        Ok(())
    }
}

//! # Inbound Ports (Driving Ports / API)
//!
//! The verification surface consumed by the gossip transport and the block
//! manager wiring.

use crate::domain::errors::VerificationError;
use crate::domain::verifier::TransactionVerifier;
use shared_types::{BlockConfirmation, Transaction};

/// Verification API.
///
/// Implementations must be thread-safe (`Send + Sync`) and must not block
/// on I/O.
pub trait TransactionVerificationApi: Send + Sync {
    /// Full transaction check including every attached receipt.
    fn verify_transaction(&self, tx: &Transaction) -> Result<(), VerificationError>;

    /// Confirmation hash and signature check.
    fn verify_confirmation(&self, confirmation: &BlockConfirmation) -> Result<(), VerificationError>;
}

impl TransactionVerificationApi for TransactionVerifier {
    fn verify_transaction(&self, tx: &Transaction) -> Result<(), VerificationError> {
        self.verify(tx)
    }

    fn verify_confirmation(&self, confirmation: &BlockConfirmation) -> Result<(), VerificationError> {
        TransactionVerifier::verify_confirmation(self, confirmation)
    }
}

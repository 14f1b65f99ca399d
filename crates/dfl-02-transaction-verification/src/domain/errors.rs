//! Error types for key handling, generation and verification.

use shared_crypto::CryptoError;
use thiserror::Error;

/// Node key loading failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(CryptoError),

    #[error("Configured address {configured} does not match key-derived address {derived}")]
    AddressMismatch { configured: String, derived: String },

    #[error("Key pair self-check failed: {0}")]
    SelfCheckFailed(CryptoError),
}

/// Failures while producing signed objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// Appending a receipt would push the relay TTL below zero.
    #[error("Transaction TTL exhausted (minimum receive TTL is {min_ttl})")]
    TtlExpired { min_ttl: u32 },

    #[error("Signing failed: {0}")]
    Signing(#[from] CryptoError),
}

/// Why a single receipt failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiptFault {
    #[error("creation time too far in the future")]
    CreatedInFuture,
    #[error("refers to a different transaction")]
    TransactionHashMismatch,
    #[error("receive TTL not below transaction TTL")]
    TtlOutOfRange,
    #[error("receive TTL repeats another receipt's")]
    DuplicateReceiveTtl,
    #[error("hash mismatch")]
    HashMismatch,
    #[error("creator address does not match public key")]
    AddressMismatch,
    #[error("creator public key invalid")]
    InvalidPublicKey,
    #[error("signature verification failed")]
    SignatureInvalid,
}

/// Why a transaction or confirmation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Expire time {expire_time} precedes creation time {creation_time}")]
    ExpiresBeforeCreation {
        creation_time: u64,
        expire_time: u64,
    },

    #[error("Creation time {creation_time} is ahead of local clock {now}")]
    CreatedInFuture { creation_time: u64, now: u64 },

    #[error("Transaction expired at {expire_time} (now {now})")]
    Expired { expire_time: u64, now: u64 },

    #[error("Hash mismatch")]
    HashMismatch,

    #[error("Creator address does not match public key")]
    AddressMismatch,

    #[error("Creator public key invalid")]
    InvalidPublicKey,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Receipt {receipt} rejected: {fault}")]
    ReceiptRejected { receipt: String, fault: ReceiptFault },
}

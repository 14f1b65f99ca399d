//! # Shared Crypto - Ledger Hashing and Signing
//!
//! Every integrity check in the ledger reduces to two primitives: SHA-256
//! over canonical bytes and ECDSA/secp256k1 over the resulting digest.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Transaction, receipt, confirmation and block digests |
//! | `ecdsa` | secp256k1 | Node identity, transaction and receipt signatures |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalized output
//! - **Digest signing**: callers hash once; the signer never re-hashes
//! - **Addresses**: `address = sha256(compressed_public_key)`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{sha256, Hash, Sha256Hasher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}

//! # ECDSA Signatures (secp256k1)
//!
//! Node identity keys and digest signatures.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization
//! - Signatures cover a 32-byte SHA-256 digest, never the raw message
//!
//! ## Use Cases
//!
//! - Transaction and receipt signing
//! - Block confirmation signing
//! - Node address derivation

use crate::hashing::{sha256, Hash};
use crate::CryptoError;
use k256::ecdsa::{
    signature::hazmat::{PrehashSigner, PrehashVerifier},
    Signature, SigningKey, VerifyingKey,
};
use zeroize::Zeroize;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Verify a signature over a 32-byte digest.
    pub fn verify_digest(
        &self,
        digest: &Hash,
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;

        verifying_key
            .verify_prehash(digest, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Derive the node address (SHA-256 of the compressed key).
    pub fn to_address(&self) -> Hash {
        sha256(&self.0)
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a hex-encoded 32-byte secret key.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(text.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: raw.len(),
            })?;
        Self::from_bytes(bytes)
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Node address derived from the public key.
    pub fn address(&self) -> Hash {
        self.public_key().to_address()
    }

    /// Sign a 32-byte digest (deterministic RFC 6979).
    pub fn sign_digest(&self, digest: &Hash) -> Result<Secp256k1Signature, CryptoError> {
        let sig: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        let bytes: [u8; 64] = sig.to_bytes().into();
        Ok(Secp256k1Signature(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Hex-encoded secret key.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.to_bytes();
        let text = hex::encode(bytes);
        bytes.zeroize();
        text
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_digest() {
        let keypair = Secp256k1KeyPair::generate();
        let digest = sha256(b"Hello, secp256k1!");

        let signature = keypair.sign_digest(&digest).unwrap();
        let result = keypair.public_key().verify_digest(&digest, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_digest_fails() {
        let keypair = Secp256k1KeyPair::generate();

        let signature = keypair.sign_digest(&sha256(b"message1")).unwrap();
        let result = keypair
            .public_key()
            .verify_digest(&sha256(b"message2"), &signature);

        assert_eq!(result, Err(CryptoError::SignatureVerificationFailed));
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let digest = sha256(b"deterministic test");

        let sig1 = keypair.sign_digest(&digest).unwrap();
        let sig2 = keypair.sign_digest(&digest).unwrap();

        assert_eq!(sig1.as_bytes(), sig2.as_bytes());
    }

    #[test]
    fn test_address_is_sha256_of_public_key() {
        let keypair = Secp256k1KeyPair::generate();
        let pubkey = keypair.public_key();

        assert_eq!(pubkey.to_address(), sha256(pubkey.as_bytes()));
        assert_eq!(keypair.address(), pubkey.to_address());
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = Secp256k1KeyPair::generate();
        let restored = Secp256k1KeyPair::from_hex(&original.to_hex()).unwrap();

        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_short_hex_key_rejected() {
        let result = Secp256k1KeyPair::from_hex("abcd");
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        assert!(Secp256k1PublicKey::from_bytes([0u8; 33]).is_err());
    }
}

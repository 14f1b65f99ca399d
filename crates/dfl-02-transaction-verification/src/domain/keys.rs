//! Local node key material.

use super::errors::KeyError;
use shared_crypto::{sha256, CryptoError, Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::{hash_to_hex, Hash, NodeIdentity, Signature};

/// The local node's signing key and the identity derived from it.
pub struct NodeKeys {
    keypair: Secp256k1KeyPair,
    identity: NodeIdentity,
}

impl NodeKeys {
    pub fn generate() -> Self {
        Self::from_keypair(Secp256k1KeyPair::generate())
    }

    pub fn from_keypair(keypair: Secp256k1KeyPair) -> Self {
        let public_key = keypair.public_key();
        let identity = NodeIdentity::new(public_key.to_address(), *public_key.as_bytes());
        Self { keypair, identity }
    }

    /// Load a hex-encoded private key.
    ///
    /// When `expected_address` is given it must equal the key-derived address.
    pub fn from_hex(private_key: &str, expected_address: Option<&str>) -> Result<Self, KeyError> {
        let keypair = Secp256k1KeyPair::from_hex(private_key).map_err(KeyError::InvalidPrivateKey)?;
        let keys = Self::from_keypair(keypair);

        if let Some(configured) = expected_address {
            let derived = hash_to_hex(&keys.identity.address);
            if !configured.trim().eq_ignore_ascii_case(&derived) {
                return Err(KeyError::AddressMismatch {
                    configured: configured.to_string(),
                    derived,
                });
            }
        }
        Ok(keys)
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn private_key_hex(&self) -> String {
        self.keypair.to_hex()
    }

    pub fn sign(&self, digest: &Hash) -> Result<Signature, CryptoError> {
        Ok(*self.keypair.sign_digest(digest)?.as_bytes())
    }

    /// Sign a probe digest, verify it with the published key, and confirm the
    /// address derivation.
    pub fn self_check(&self) -> Result<(), KeyError> {
        let probe = sha256(b"dfl-node-key-self-check");
        let signature = self.keypair.sign_digest(&probe).map_err(KeyError::SelfCheckFailed)?;
        let public_key =
            Secp256k1PublicKey::from_bytes(self.identity.public_key).map_err(KeyError::SelfCheckFailed)?;
        public_key
            .verify_digest(&probe, &signature)
            .map_err(KeyError::SelfCheckFailed)?;

        if sha256(&self.identity.public_key) != self.identity.address {
            return Err(KeyError::SelfCheckFailed(CryptoError::InvalidPublicKey));
        }
        Ok(())
    }
}

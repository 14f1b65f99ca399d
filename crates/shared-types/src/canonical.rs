//! # Canonical Encoding
//!
//! Deterministic byte layout fed into SHA-256. Integers are little-endian,
//! variable-length fields carry a `u64` length prefix, fixed-size digests and
//! keys are written raw.

use shared_crypto::{sha256, Hash};

/// Append-only buffer of canonical bytes.
#[derive(Debug, Default)]
pub struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Fixed-width bytes, written without a length prefix.
    pub fn put_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Length-prefixed bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_u64(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_str(&mut self, text: &str) -> &mut Self {
        self.put_bytes(text.as_bytes())
    }

    /// An absent hash encodes as an empty length-prefixed field.
    pub fn put_opt_hash(&mut self, hash: Option<&Hash>) -> &mut Self {
        match hash {
            Some(h) => self.put_bytes(h),
            None => self.put_bytes(&[]),
        }
    }

    pub fn put<T: CanonicalEncode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode_canonical(self);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn digest(&self) -> Hash {
        sha256(&self.buf)
    }
}

/// Types with a deterministic hash/sign input.
pub trait CanonicalEncode {
    fn encode_canonical(&self, out: &mut CanonicalWriter);

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut writer = CanonicalWriter::new();
        self.encode_canonical(&mut writer);
        writer.into_bytes()
    }

    fn canonical_digest(&self) -> Hash {
        sha256(&self.canonical_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix_separates_adjacent_fields() {
        let mut a = CanonicalWriter::new();
        a.put_str("ab").put_str("c");
        let mut b = CanonicalWriter::new();
        b.put_str("a").put_str("bc");

        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_absent_hash_differs_from_zero_hash() {
        let mut none = CanonicalWriter::new();
        none.put_opt_hash(None);
        let mut zero = CanonicalWriter::new();
        zero.put_opt_hash(Some(&[0u8; 32]));

        assert_ne!(none.as_bytes(), zero.as_bytes());
    }

    #[test]
    fn test_integers_are_little_endian() {
        let mut w = CanonicalWriter::new();
        w.put_u32(1).put_u64(2);
        assert_eq!(w.as_bytes(), &[1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]);
    }
}

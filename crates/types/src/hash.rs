//! Cryptographic hash type using BLAKE2b-256.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// A 32-byte cryptographic hash using BLAKE2b-256.
///
/// Safe to use as a HashMap key. All hashing operations are deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Size of hash in bytes.
    pub const BYTES: usize = 32;

    /// Zero hash (all bytes are 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create hash from bytes using BLAKE2b-256.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Create hash from multiple byte slices.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Blake2b256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Create a Hash from raw hash bytes (without hashing).
    ///
    /// Returns `None` if `bytes` is not exactly 32 bytes long.
    pub fn from_hash_bytes(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Parse hash from hex string.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        if hex.len() != 64 {
            return Err(HexError::InvalidLength {
                expected: 64,
                actual: hex.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| HexError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Convert hash to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to bytes array.
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form for logs: first 8 hex chars
        write!(f, "Hash({}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Errors parsing a hash from hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid hex characters")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let a = Hash::from_bytes(b"hello");
        let b = Hash::from_bytes(b"hello");
        let c = Hash::from_bytes(b"world");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_parts_matches_concatenation() {
        let joined = Hash::from_bytes(b"foobar");
        let parts = Hash::from_parts(&[b"foo", b"bar"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_hex_roundtrip() {
        let h = Hash::from_bytes(b"roundtrip");
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_from_hash_bytes_length_check() {
        assert!(Hash::from_hash_bytes(&[0u8; 32]).is_some());
        assert!(Hash::from_hash_bytes(&[0u8; 31]).is_none());
        assert!(Hash::from_hash_bytes(&[0u8; 33]).is_none());
    }
}

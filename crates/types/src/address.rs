//! Delegate addresses.
//!
//! An address is the 20-byte BLAKE2b-256 prefix of a delegate's identity
//! public key. Bech32 encoding and key derivation live outside the consensus
//! core; here an address is an opaque identifier with hex formatting.

use crate::crypto::PublicKey;
use crate::hash::Hash;
use std::fmt;

/// A 20-byte delegate address derived from an identity public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Size of an address in bytes.
    pub const BYTES: usize = 20;

    /// The nil address. Dummy blocks carry it as their producer.
    pub const NIL: Self = Self([0u8; 20]);

    /// Derive the address of an identity public key.
    pub fn from_public_key(pubkey: &PublicKey) -> Self {
        let digest = Hash::from_bytes(pubkey.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Self(bytes)
    }

    /// Create an address from raw bytes.
    ///
    /// Returns `None` if `bytes` is not exactly 20 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Parse an address from its hex form.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 40 {
            return None;
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Whether this is the nil address.
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Hex form, used on the wire and in logs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

//! Cryptographic primitives for delegate identity and DKG randomness.
//!
//! Two schemes are in play:
//!
//! - **Identity signatures** (`KeyPair` / `PublicKey` / `Signature`): Ed25519
//!   over a BLAKE2b-256 digest. Delegates sign blocks and endorsements with
//!   their identity key.
//! - **BLS12-381** (`BlsSecretKey` / `BlsPublicKey` / `BlsSignature`):
//!   aggregatable signatures used by the per-epoch DKG material to co-sign
//!   the epoch seed. Aggregates over the same message are verified with a
//!   single pairing check.
//!
//! Deterministic `*_from_seed` constructors exist for tests and simulation.

use crate::address::Address;
use ed25519_dalek::{Signer, Verifier};
use std::fmt;
use thiserror::Error;

/// Errors from key parsing, signing, and aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("invalid secret key bytes")]
    InvalidSecretKey,
    #[error("signature aggregation failed")]
    AggregationFailed,
    #[error("nothing to aggregate")]
    EmptyAggregate,
}

// ═══════════════════════════════════════════════════════════════════════
// Identity scheme (Ed25519)
// ═══════════════════════════════════════════════════════════════════════

/// A delegate identity keypair.
#[derive(Clone)]
pub struct KeyPair {
    signing: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Generate a keypair from a seed (deterministic, for testing/simulation).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// The address derived from this keypair's public key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    /// Sign a message digest.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.address())
    }
}

/// A delegate identity public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Size of a public key in bytes.
    pub const BYTES: usize = 32;

    /// Parse and validate a public key from bytes.
    ///
    /// Rejects byte strings that do not decode to a valid curve point. Use
    /// this on every ingress path.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(arr))
    }

    /// Wrap raw bytes without curve validation.
    ///
    /// Only for placeholder keys (dummy blocks carry a zero key that never
    /// verifies); `verify` on such a key returns `false`.
    pub fn from_raw_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero placeholder key.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", &hex::encode(&self.0[..4]))
    }
}

/// An identity signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Size of a signature in bytes.
    pub const BYTES: usize = 64;

    /// Parse a signature from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &hex::encode(&self.0[..4]))
    }
}

/// A zero/placeholder signature for dummy blocks and tests.
pub fn zero_signature() -> Signature {
    Signature([0u8; 64])
}

// ═══════════════════════════════════════════════════════════════════════
// BLS12-381 (min-pk: 48-byte public keys, 96-byte signatures)
// ═══════════════════════════════════════════════════════════════════════

/// Ciphersuite domain separation tag for BLS signing.
const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// A BLS12-381 secret key (DKG share).
#[derive(Clone)]
pub struct BlsSecretKey([u8; 32]);

impl BlsSecretKey {
    /// Generate a new random BLS secret key.
    pub fn generate() -> Self {
        let mut ikm = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut ikm);
        Self::from_seed(&ikm)
    }

    /// Derive a BLS secret key from a seed (deterministic, for tests).
    ///
    /// Uses blst's `key_gen`, which hashes the full seed into a valid
    /// scalar; any 32-byte seed is accepted.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let sk = blst::min_pk::SecretKey::key_gen(seed, &[])
            .expect("key_gen accepts any 32-byte seed");
        Self(sk.to_bytes())
    }

    fn inner(&self) -> blst::min_pk::SecretKey {
        blst::min_pk::SecretKey::from_bytes(&self.0).expect("stored scalar is valid")
    }

    /// The public half of this key.
    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey(self.inner().sk_to_pk().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature(self.inner().sign(message, BLS_DST, &[]).to_bytes())
    }
}

impl fmt::Debug for BlsSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSecretKey(..)")
    }
}

/// A BLS12-381 public key (compressed G1 point).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlsPublicKey([u8; 48]);

impl BlsPublicKey {
    /// Size of a BLS public key in bytes.
    pub const BYTES: usize = 48;

    /// Parse and validate a BLS public key from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key = blst::min_pk::PublicKey::key_validate(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key.to_bytes()))
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    fn inner(&self) -> Option<blst::min_pk::PublicKey> {
        blst::min_pk::PublicKey::from_bytes(&self.0).ok()
    }
}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey({}..)", &hex::encode(&self.0[..4]))
    }
}

/// A BLS12-381 signature (compressed G2 point).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlsSignature([u8; 96]);

impl BlsSignature {
    /// Size of a BLS signature in bytes.
    pub const BYTES: usize = 96;

    /// Parse a BLS signature from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let sig = blst::min_pk::Signature::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(sig.to_bytes()))
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 96] {
        &self.0
    }

    fn inner(&self) -> Option<blst::min_pk::Signature> {
        blst::min_pk::Signature::from_bytes(&self.0).ok()
    }
}

impl fmt::Debug for BlsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSignature({}..)", &hex::encode(&self.0[..4]))
    }
}

/// Verify a single BLS signature.
pub fn verify_bls(message: &[u8], pubkey: &BlsPublicKey, signature: &BlsSignature) -> bool {
    let (Some(pk), Some(sig)) = (pubkey.inner(), signature.inner()) else {
        return false;
    };
    sig.verify(true, message, BLS_DST, &[], &pk, true) == blst::BLST_ERROR::BLST_SUCCESS
}

/// Aggregate BLS signatures into a single signature.
pub fn aggregate_bls_signatures(signatures: &[BlsSignature]) -> Result<BlsSignature, CryptoError> {
    if signatures.is_empty() {
        return Err(CryptoError::EmptyAggregate);
    }
    let parsed: Vec<blst::min_pk::Signature> = signatures
        .iter()
        .map(|s| s.inner().ok_or(CryptoError::InvalidSignature))
        .collect::<Result<_, _>>()?;
    let refs: Vec<&blst::min_pk::Signature> = parsed.iter().collect();
    let aggregate = blst::min_pk::AggregateSignature::aggregate(&refs, true)
        .map_err(|_| CryptoError::AggregationFailed)?;
    Ok(BlsSignature(aggregate.to_signature().to_bytes()))
}

/// Verify an aggregate BLS signature over the SAME message.
///
/// This is the consensus case: every DKG share signs the epoch seed, so the
/// aggregate verifies with a single pairing check against the aggregated
/// public keys.
pub fn verify_bls_aggregate(
    message: &[u8],
    pubkeys: &[BlsPublicKey],
    aggregate: &BlsSignature,
) -> bool {
    if pubkeys.is_empty() {
        return false;
    }
    let Some(sig) = aggregate.inner() else {
        return false;
    };
    let parsed: Option<Vec<blst::min_pk::PublicKey>> =
        pubkeys.iter().map(|p| p.inner()).collect();
    let Some(parsed) = parsed else {
        return false;
    };
    let refs: Vec<&blst::min_pk::PublicKey> = parsed.iter().collect();
    sig.fast_aggregate_verify(true, message, BLS_DST, &refs) == blst::BLST_ERROR::BLST_SUCCESS
}

// ═══════════════════════════════════════════════════════════════════════
// DKG material
// ═══════════════════════════════════════════════════════════════════════

/// Per-epoch DKG key share of one delegate.
///
/// The share signs the epoch seed; the resulting signature travels in the
/// header of every block the delegate mints during the epoch, and the seed
/// aggregator folds those signatures into the next epoch's seed.
#[derive(Debug, Clone)]
pub struct DkgMaterial {
    /// Share identifier (the delegate address bytes).
    pub id: Vec<u8>,
    /// Public half of the share.
    pub public_key: BlsPublicKey,
    /// Secret half of the share.
    pub secret_key: BlsSecretKey,
}

impl DkgMaterial {
    /// Derive fresh DKG material for an epoch.
    pub fn generate(id: Vec<u8>) -> Self {
        let secret_key = BlsSecretKey::generate();
        Self {
            id,
            public_key: secret_key.public_key(),
            secret_key,
        }
    }

    /// Sign the epoch seed with this share.
    pub fn sign_seed(&self, seed: &[u8]) -> BlsSignature {
        self.secret_key.sign(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_sign_verify() {
        let keypair = KeyPair::from_seed(&[1u8; 32]);
        let sig = keypair.sign(b"message");
        assert!(keypair.public_key().verify(b"message", &sig));
        assert!(!keypair.public_key().verify(b"other", &sig));
    }

    #[test]
    fn test_identity_wrong_key_fails() {
        let a = KeyPair::from_seed(&[1u8; 32]);
        let b = KeyPair::from_seed(&[2u8; 32]);
        let sig = a.sign(b"message");
        assert!(!b.public_key().verify(b"message", &sig));
    }

    #[test]
    fn test_public_key_parse_rejects_garbage() {
        // Not a curve point
        assert!(PublicKey::from_bytes(&[0xffu8; 32]).is_err());
        // Wrong length
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_bls_sign_verify() {
        let sk = BlsSecretKey::from_seed(&[3u8; 32]);
        let sig = sk.sign(b"seed");
        assert!(verify_bls(b"seed", &sk.public_key(), &sig));
        assert!(!verify_bls(b"other", &sk.public_key(), &sig));
    }

    #[test]
    fn test_bls_aggregate_same_message() {
        let message = b"previous epoch seed";
        let keys: Vec<BlsSecretKey> = (0u8..4)
            .map(|i| BlsSecretKey::from_seed(&[i + 10; 32]))
            .collect();
        let sigs: Vec<BlsSignature> = keys.iter().map(|k| k.sign(message)).collect();
        let pubkeys: Vec<BlsPublicKey> = keys.iter().map(|k| k.public_key()).collect();

        let aggregate = aggregate_bls_signatures(&sigs).unwrap();
        assert!(verify_bls_aggregate(message, &pubkeys, &aggregate));

        // Dropping one pubkey breaks verification
        assert!(!verify_bls_aggregate(message, &pubkeys[..3], &aggregate));
    }

    #[test]
    fn test_bls_aggregate_empty_fails() {
        assert_eq!(
            aggregate_bls_signatures(&[]),
            Err(CryptoError::EmptyAggregate)
        );
    }

    #[test]
    fn test_dkg_material_signs_seed() {
        let dkg = DkgMaterial::generate(b"delegate-id".to_vec());
        let sig = dkg.sign_seed(b"seed");
        assert!(verify_bls(b"seed", &dkg.public_key, &sig));
        // The empty seed of the first epochs is also signable
        let sig = dkg.sign_seed(&[]);
        assert!(verify_bls(&[], &dkg.public_key, &sig));
    }
}

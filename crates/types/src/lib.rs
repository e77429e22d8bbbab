//! Core types for Roll-DPoS consensus.
//!
//! This crate provides the foundational types shared by the consensus core
//! and its collaborators:
//!
//! - [`Hash`]: BLAKE2b-256 content hash
//! - [`Address`]: delegate address derived from an identity public key
//! - [`KeyPair`] / [`PublicKey`] / [`Signature`]: delegate identity scheme
//! - [`BlsSecretKey`] / [`BlsPublicKey`] / [`BlsSignature`] and the
//!   aggregate helpers: DKG randomness scheme
//! - [`DkgMaterial`]: per-epoch BLS key share
//! - [`Block`] / [`BlockHeader`] / [`Action`]: the chain surface the core
//!   depends on
//! - [`Endorsement`] / [`Topic`]: signed consensus votes

mod address;
mod block;
mod crypto;
mod endorsement;
mod hash;

pub use address::Address;
pub use block::{Action, Block, BlockHeader};
pub use crypto::{
    aggregate_bls_signatures, verify_bls, verify_bls_aggregate, zero_signature, BlsPublicKey,
    BlsSecretKey, BlsSignature, CryptoError, DkgMaterial, KeyPair, PublicKey, Signature,
};
pub use endorsement::{Endorsement, Topic};
pub use hash::{Hash, HexError};

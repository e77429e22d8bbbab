//! Block and header types as seen by the consensus core.
//!
//! The chain collaborator owns the full block schema (actions, receipts,
//! state roots); the core only needs the header fields it validates and the
//! accessors used during a consensus round.

use crate::address::Address;
use crate::crypto::{self, KeyPair, PublicKey, Signature};
use crate::hash::Hash;
use std::time::Duration;

/// An opaque action (transaction) carried by a block.
///
/// Action semantics belong to the chain collaborator; the core only moves
/// them around.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Action {
    /// Serialized action payload.
    pub payload: Vec<u8>,
}

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Chain this block belongs to.
    pub chain_id: u32,
    /// Block height.
    pub height: u64,
    /// Creation time, milliseconds since the UNIX epoch.
    pub timestamp_ms: u64,
    /// Hash of the previous block.
    pub prev_block_hash: Hash,
    /// Merkle-style digest over the block's actions.
    pub action_root: Hash,
    /// Producer (proposer) address. Nil for dummy blocks.
    pub producer: Address,
    /// DKG share identifier, empty when the producer carries no DKG material.
    pub dkg_id: Vec<u8>,
    /// DKG public key bytes, empty when absent.
    pub dkg_pubkey: Vec<u8>,
    /// BLS signature of the epoch seed by the producer's DKG share, empty
    /// when absent.
    pub dkg_block_sig: Vec<u8>,
}

impl BlockHeader {
    /// Canonical byte stream of the header, the input to the block hash.
    pub fn byte_stream(&self) -> Vec<u8> {
        let mut stream = Vec::with_capacity(96 + self.dkg_id.len() + self.dkg_pubkey.len());
        stream.extend_from_slice(&self.chain_id.to_le_bytes());
        stream.extend_from_slice(&self.height.to_le_bytes());
        stream.extend_from_slice(&self.timestamp_ms.to_le_bytes());
        stream.extend_from_slice(self.prev_block_hash.as_bytes());
        stream.extend_from_slice(self.action_root.as_bytes());
        stream.extend_from_slice(self.producer.as_bytes());
        stream.extend_from_slice(&self.dkg_id);
        stream.extend_from_slice(&self.dkg_pubkey);
        stream.extend_from_slice(&self.dkg_block_sig);
        stream
    }

    /// Creation time as a duration since the UNIX epoch.
    pub fn timestamp(&self) -> Duration {
        Duration::from_millis(self.timestamp_ms)
    }
}

/// A block as consumed by the consensus core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Header, covered by the producer signature.
    pub header: BlockHeader,
    /// Actions included in this block. Empty for dummy blocks.
    pub actions: Vec<Action>,
    /// Producer identity public key.
    pub producer_pubkey: PublicKey,
    /// Producer identity signature over the block hash.
    pub signature: Signature,
}

impl Block {
    /// Block height.
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Producer address.
    pub fn producer_address(&self) -> Address {
        self.header.producer
    }

    /// Hash of this block (BLAKE2b-256 of the header byte stream).
    pub fn hash_block(&self) -> Hash {
        Hash::from_bytes(&self.header.byte_stream())
    }

    /// Whether this is a dummy block minted to advance height without
    /// agreement. Dummy blocks carry the nil producer and no signature.
    pub fn is_dummy(&self) -> bool {
        self.header.producer.is_nil()
    }

    /// Whether the header carries complete DKG material.
    pub fn has_dkg(&self) -> bool {
        !self.header.dkg_pubkey.is_empty() && !self.header.dkg_block_sig.is_empty()
    }

    /// Verify the producer signature.
    ///
    /// Checks that the carried public key derives the producer address and
    /// that the signature verifies over the block hash.
    pub fn verify_signature(&self) -> bool {
        if Address::from_public_key(&self.producer_pubkey) != self.header.producer {
            return false;
        }
        self.producer_pubkey
            .verify(self.hash_block().as_bytes(), &self.signature)
    }

    /// Digest over a block's actions, stored in the header.
    pub fn compute_action_root(actions: &[Action]) -> Hash {
        if actions.is_empty() {
            return Hash::ZERO;
        }
        let parts: Vec<&[u8]> = actions.iter().map(|a| a.payload.as_slice()).collect();
        Hash::from_parts(&parts)
    }

    /// Sign a header with the producer keypair, producing a complete block.
    pub fn new_signed(header: BlockHeader, actions: Vec<Action>, producer: &KeyPair) -> Self {
        let mut block = Self {
            header,
            actions,
            producer_pubkey: producer.public_key(),
            signature: crypto::zero_signature(),
        };
        block.signature = producer.sign(block.hash_block().as_bytes());
        block
    }

    /// Build an unsigned dummy block at `height` on top of `prev_block_hash`.
    pub fn new_dummy(chain_id: u32, height: u64, timestamp_ms: u64, prev_block_hash: Hash) -> Self {
        Self {
            header: BlockHeader {
                chain_id,
                height,
                timestamp_ms,
                prev_block_hash,
                action_root: Hash::ZERO,
                producer: Address::NIL,
                dkg_id: Vec::new(),
                dkg_pubkey: Vec::new(),
                dkg_block_sig: Vec::new(),
            },
            actions: Vec::new(),
            producer_pubkey: PublicKey::zero(),
            signature: crypto::zero_signature(),
        }
    }
}

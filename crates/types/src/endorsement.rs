//! Endorsements: signed consensus votes.
//!
//! An endorsement binds one endorser to a `(height, block_hash, topic,
//! decision)` tuple. Its canonical byte stream is
//!
//! ```text
//! [height: u64 little-endian | topic: u8 | block_hash: 32 bytes | decision: u8]
//! ```
//!
//! The signature hash is BLAKE2b-256 of that stream and the signature is the
//! delegate identity scheme over the hash.

use crate::address::Address;
use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::hash::Hash;

/// The voting phase an endorsement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// First phase: endorse or reject a proposer's block.
    Proposal,
    /// Second phase: endorse the proposal-phase outcome.
    Commit,
}

impl Topic {
    /// Wire byte of this topic.
    pub fn as_u8(&self) -> u8 {
        match self {
            Topic::Proposal => 0,
            Topic::Commit => 1,
        }
    }
}

/// A signed consensus vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endorsement {
    /// Height the vote applies to.
    pub height: u64,
    /// Hash of the block being voted on.
    pub block_hash: Hash,
    /// Voting phase.
    pub topic: Topic,
    /// The vote itself; `true` agrees.
    pub decision: bool,
    /// Address of the endorser.
    pub endorser: Address,
    /// Identity public key of the endorser.
    pub endorser_pubkey: PublicKey,
    /// Identity signature over [`Endorsement::signature_hash`].
    pub signature: Signature,
}

impl Endorsement {
    /// Build and sign an endorsement with the endorser's keypair.
    pub fn new_signed(
        height: u64,
        block_hash: Hash,
        topic: Topic,
        decision: bool,
        endorser: &KeyPair,
    ) -> Self {
        let hash = Self::hash_fields(height, &block_hash, topic, decision);
        Self {
            height,
            block_hash,
            topic,
            decision,
            endorser: endorser.address(),
            endorser_pubkey: endorser.public_key(),
            signature: endorser.sign(hash.as_bytes()),
        }
    }

    /// Canonical byte stream of the signed fields.
    pub fn byte_stream(&self) -> Vec<u8> {
        Self::stream_fields(self.height, &self.block_hash, self.topic, self.decision)
    }

    /// BLAKE2b-256 of the byte stream; the signed message.
    pub fn signature_hash(&self) -> Hash {
        Hash::from_bytes(&self.byte_stream())
    }

    /// Verify this endorsement.
    ///
    /// Checks the address/public-key binding and the signature over the
    /// signature hash. Run on every ingress path before a vote is tallied.
    pub fn verify(&self) -> bool {
        if Address::from_public_key(&self.endorser_pubkey) != self.endorser {
            return false;
        }
        self.endorser_pubkey
            .verify(self.signature_hash().as_bytes(), &self.signature)
    }

    fn stream_fields(height: u64, block_hash: &Hash, topic: Topic, decision: bool) -> Vec<u8> {
        let mut stream = Vec::with_capacity(42);
        stream.extend_from_slice(&height.to_le_bytes());
        stream.push(topic.as_u8());
        stream.extend_from_slice(block_hash.as_bytes());
        stream.push(decision as u8);
        stream
    }

    fn hash_fields(height: u64, block_hash: &Hash, topic: Topic, decision: bool) -> Hash {
        Hash::from_bytes(&Self::stream_fields(height, block_hash, topic, decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> KeyPair {
        KeyPair::from_seed(&[11u8; 32])
    }

    #[test]
    fn test_byte_stream_layout() {
        let en = Endorsement::new_signed(
            0x0102030405060708,
            Hash::from_bytes(b"block"),
            Topic::Commit,
            true,
            &keypair(),
        );
        let stream = en.byte_stream();
        assert_eq!(stream.len(), 42);
        // height little-endian
        assert_eq!(&stream[..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        // topic byte
        assert_eq!(stream[8], 1);
        // block hash
        assert_eq!(&stream[9..41], Hash::from_bytes(b"block").as_bytes());
        // decision byte
        assert_eq!(stream[41], 1);
    }

    #[test]
    fn test_signed_endorsement_verifies() {
        let en = Endorsement::new_signed(5, Hash::from_bytes(b"block"), Topic::Proposal, true, &keypair());
        assert!(en.verify());
    }

    #[test]
    fn test_tampered_decision_fails() {
        let mut en =
            Endorsement::new_signed(5, Hash::from_bytes(b"block"), Topic::Proposal, true, &keypair());
        en.decision = false;
        assert!(!en.verify());
    }

    #[test]
    fn test_tampered_topic_fails() {
        let mut en =
            Endorsement::new_signed(5, Hash::from_bytes(b"block"), Topic::Proposal, true, &keypair());
        en.topic = Topic::Commit;
        assert!(!en.verify());
    }

    #[test]
    fn test_mismatched_endorser_address_fails() {
        let other = KeyPair::from_seed(&[12u8; 32]);
        let mut en =
            Endorsement::new_signed(5, Hash::from_bytes(b"block"), Topic::Proposal, true, &keypair());
        // Claim another delegate endorsed it
        en.endorser = other.address();
        assert!(!en.verify());
    }

    #[test]
    fn test_proposal_and_commit_hashes_differ() {
        let kp = keypair();
        let a = Endorsement::new_signed(5, Hash::from_bytes(b"block"), Topic::Proposal, true, &kp);
        let b = Endorsement::new_signed(5, Hash::from_bytes(b"block"), Topic::Commit, true, &kp);
        assert_ne!(a.signature_hash(), b.signature_hash());
    }
}

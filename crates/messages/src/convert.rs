//! Domain ⇄ wire conversions.
//!
//! Decoding is strict: unparsable addresses, hashes, keys, or signatures
//! reject the whole message. A vote that cannot be verified must never reach
//! the tally.

use crate::proto::{
    consensus_pb, ActionPb, BlockHeaderPb, BlockPb, ConsensusPb, EndorsePb, EndorsementTopic,
    ProposePb,
};
use rolldpos_core::OutboundMessage;
use rolldpos_types::{
    Action, Address, Block, BlockHeader, CryptoError, Endorsement, Hash, PublicKey, Signature,
    Topic,
};
use thiserror::Error;

/// Wire decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("invalid block hash bytes")]
    InvalidHash,
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("invalid endorser public key: {0}")]
    InvalidPublicKey(#[from] CryptoError),
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("unknown endorsement topic {0}")]
    UnknownTopic(i32),
}

// ═══════════════════════════════════════════════════════════════════════
// Endorsements
// ═══════════════════════════════════════════════════════════════════════

impl From<&Endorsement> for EndorsePb {
    fn from(en: &Endorsement) -> Self {
        let topic = match en.topic {
            Topic::Proposal => EndorsementTopic::Proposal,
            Topic::Commit => EndorsementTopic::Commit,
        };
        Self {
            height: en.height,
            block_hash: en.block_hash.as_bytes().to_vec(),
            topic: topic as i32,
            endorser: en.endorser.to_hex(),
            endorser_pub_key: en.endorser_pubkey.as_bytes().to_vec(),
            decision: en.decision,
            signature: en.signature.as_bytes().to_vec(),
        }
    }
}

impl TryFrom<&EndorsePb> for Endorsement {
    type Error = ConvertError;

    fn try_from(pb: &EndorsePb) -> Result<Self, Self::Error> {
        let topic = match EndorsementTopic::try_from(pb.topic) {
            Ok(EndorsementTopic::Proposal) => Topic::Proposal,
            Ok(EndorsementTopic::Commit) => Topic::Commit,
            Err(_) => return Err(ConvertError::UnknownTopic(pb.topic)),
        };
        let block_hash =
            Hash::from_hash_bytes(&pb.block_hash).ok_or(ConvertError::InvalidHash)?;
        let endorser = Address::from_hex(&pb.endorser)
            .ok_or_else(|| ConvertError::InvalidAddress(pb.endorser.clone()))?;
        let endorser_pubkey = PublicKey::from_bytes(&pb.endorser_pub_key)?;
        let signature =
            Signature::from_bytes(&pb.signature).map_err(|_| ConvertError::InvalidSignature)?;

        Ok(Self {
            height: pb.height,
            block_hash,
            topic,
            decision: pb.decision,
            endorser,
            endorser_pubkey,
            signature,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Blocks
// ═══════════════════════════════════════════════════════════════════════

impl From<&Block> for BlockPb {
    fn from(block: &Block) -> Self {
        let header = &block.header;
        Self {
            header: Some(BlockHeaderPb {
                chain_id: header.chain_id,
                height: header.height,
                timestamp: header.timestamp_ms,
                prev_block_hash: header.prev_block_hash.as_bytes().to_vec(),
                action_root: header.action_root.as_bytes().to_vec(),
                producer: if header.producer.is_nil() {
                    String::new()
                } else {
                    header.producer.to_hex()
                },
                dkg_id: header.dkg_id.clone(),
                dkg_pubkey: header.dkg_pubkey.clone(),
                dkg_block_sig: header.dkg_block_sig.clone(),
            }),
            actions: block
                .actions
                .iter()
                .map(|a| ActionPb {
                    payload: a.payload.clone(),
                })
                .collect(),
            producer_pub_key: block.producer_pubkey.as_bytes().to_vec(),
            signature: block.signature.as_bytes().to_vec(),
        }
    }
}

impl TryFrom<&BlockPb> for Block {
    type Error = ConvertError;

    fn try_from(pb: &BlockPb) -> Result<Self, Self::Error> {
        let header_pb = pb.header.as_ref().ok_or(ConvertError::MissingField("header"))?;
        let producer = if header_pb.producer.is_empty() {
            Address::NIL
        } else {
            Address::from_hex(&header_pb.producer)
                .ok_or_else(|| ConvertError::InvalidAddress(header_pb.producer.clone()))?
        };
        let header = BlockHeader {
            chain_id: header_pb.chain_id,
            height: header_pb.height,
            timestamp_ms: header_pb.timestamp,
            prev_block_hash: Hash::from_hash_bytes(&header_pb.prev_block_hash)
                .ok_or(ConvertError::InvalidHash)?,
            action_root: Hash::from_hash_bytes(&header_pb.action_root)
                .ok_or(ConvertError::InvalidHash)?,
            producer,
            dkg_id: header_pb.dkg_id.clone(),
            dkg_pubkey: header_pb.dkg_pubkey.clone(),
            dkg_block_sig: header_pb.dkg_block_sig.clone(),
        };

        // Producer keys are validated by block signature verification, not
        // here: dummy blocks legitimately carry a zero key.
        let raw_key: [u8; 32] = pb
            .producer_pub_key
            .as_slice()
            .try_into()
            .map_err(|_| ConvertError::InvalidPublicKey(CryptoError::InvalidPublicKey))?;

        Ok(Self {
            header,
            actions: pb
                .actions
                .iter()
                .map(|a| Action {
                    payload: a.payload.clone(),
                })
                .collect(),
            producer_pubkey: PublicKey::from_raw_bytes(raw_key),
            signature: Signature::from_bytes(&pb.signature)
                .map_err(|_| ConvertError::InvalidSignature)?,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Broadcast envelope
// ═══════════════════════════════════════════════════════════════════════

impl From<&OutboundMessage> for ConsensusPb {
    fn from(msg: &OutboundMessage) -> Self {
        let inner = match msg {
            OutboundMessage::Propose { proposer, block } => {
                consensus_pb::Msg::Propose(ProposePb {
                    proposer: proposer.to_hex(),
                    block: Some(BlockPb::from(block)),
                })
            }
            OutboundMessage::Endorse(en) => consensus_pb::Msg::Endorse(EndorsePb::from(en)),
            OutboundMessage::Block(block) => consensus_pb::Msg::Block(BlockPb::from(block)),
        };
        Self { msg: Some(inner) }
    }
}

impl TryFrom<&ConsensusPb> for OutboundMessage {
    type Error = ConvertError;

    fn try_from(pb: &ConsensusPb) -> Result<Self, Self::Error> {
        match pb.msg.as_ref().ok_or(ConvertError::MissingField("msg"))? {
            consensus_pb::Msg::Propose(propose) => {
                let block_pb = propose
                    .block
                    .as_ref()
                    .ok_or(ConvertError::MissingField("block"))?;
                Ok(OutboundMessage::Propose {
                    proposer: Address::from_hex(&propose.proposer)
                        .ok_or_else(|| ConvertError::InvalidAddress(propose.proposer.clone()))?,
                    block: Block::try_from(block_pb)?,
                })
            }
            consensus_pb::Msg::Endorse(en) => Ok(OutboundMessage::Endorse(Endorsement::try_from(en)?)),
            consensus_pb::Msg::Block(block) => Ok(OutboundMessage::Block(Block::try_from(block)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use rolldpos_types::KeyPair;

    fn keypair() -> KeyPair {
        KeyPair::from_seed(&[21u8; 32])
    }

    fn signed_block(producer: &KeyPair) -> Block {
        let header = BlockHeader {
            chain_id: 1,
            height: 9,
            timestamp_ms: 1_700_000_000_000,
            prev_block_hash: Hash::from_bytes(b"prev"),
            action_root: Hash::ZERO,
            producer: producer.address(),
            dkg_id: b"id".to_vec(),
            dkg_pubkey: b"pk".to_vec(),
            dkg_block_sig: b"sig".to_vec(),
        };
        Block::new_signed(header, vec![Action { payload: b"act".to_vec() }], producer)
    }

    #[test]
    fn test_endorsement_roundtrip_still_verifies() {
        let en = Endorsement::new_signed(
            7,
            Hash::from_bytes(b"block"),
            Topic::Proposal,
            true,
            &keypair(),
        );
        assert!(en.verify());

        let pb = EndorsePb::from(&en);
        let encoded = pb.encode_to_vec();
        let decoded_pb = EndorsePb::decode(encoded.as_slice()).unwrap();
        let decoded = Endorsement::try_from(&decoded_pb).unwrap();

        assert_eq!(decoded, en);
        assert!(decoded.verify());
    }

    #[test]
    fn test_endorsement_bad_pubkey_rejected() {
        let en = Endorsement::new_signed(
            7,
            Hash::from_bytes(b"block"),
            Topic::Commit,
            false,
            &keypair(),
        );
        let mut pb = EndorsePb::from(&en);
        pb.endorser_pub_key = vec![0xff; 32];
        assert!(matches!(
            Endorsement::try_from(&pb),
            Err(ConvertError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_endorsement_unknown_topic_rejected() {
        let en = Endorsement::new_signed(
            7,
            Hash::from_bytes(b"block"),
            Topic::Commit,
            true,
            &keypair(),
        );
        let mut pb = EndorsePb::from(&en);
        pb.topic = 9;
        assert_eq!(Endorsement::try_from(&pb), Err(ConvertError::UnknownTopic(9)));
    }

    #[test]
    fn test_block_roundtrip_preserves_hash_and_signature() {
        let producer = keypair();
        let block = signed_block(&producer);

        let pb = BlockPb::from(&block);
        let encoded = pb.encode_to_vec();
        let decoded_pb = BlockPb::decode(encoded.as_slice()).unwrap();
        let decoded = Block::try_from(&decoded_pb).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.hash_block(), block.hash_block());
        assert!(decoded.verify_signature());
    }

    #[test]
    fn test_dummy_block_roundtrip() {
        let dummy = Block::new_dummy(1, 4, 1_700_000_000_000, Hash::from_bytes(b"prev"));
        let pb = BlockPb::from(&dummy);
        let decoded = Block::try_from(&pb).unwrap();
        assert!(decoded.is_dummy());
        assert_eq!(decoded, dummy);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let producer = keypair();
        let block = signed_block(&producer);
        let msg = OutboundMessage::Propose {
            proposer: producer.address(),
            block,
        };

        let pb = ConsensusPb::from(&msg);
        let encoded = pb.encode_to_vec();
        let decoded_pb = ConsensusPb::decode(encoded.as_slice()).unwrap();
        let decoded = OutboundMessage::try_from(&decoded_pb).unwrap();
        assert_eq!(decoded, msg);
    }
}

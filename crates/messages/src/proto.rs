//! Wire message definitions.
//!
//! Hand-declared `prost` messages; field numbers are part of the network
//! protocol and must not change.

/// A block proposal.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProposePb {
    /// Address of the proposing delegate, hex form.
    #[prost(string, tag = "1")]
    pub proposer: ::prost::alloc::string::String,
    /// The proposed block.
    #[prost(message, optional, tag = "2")]
    pub block: ::core::option::Option<BlockPb>,
}

/// A consensus vote.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorsePb {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub block_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(enumeration = "EndorsementTopic", tag = "3")]
    pub topic: i32,
    /// Endorser address, hex form.
    #[prost(string, tag = "4")]
    pub endorser: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "5")]
    pub endorser_pub_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bool, tag = "6")]
    pub decision: bool,
    #[prost(bytes = "vec", tag = "7")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}

/// Voting phase of an endorsement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EndorsementTopic {
    Proposal = 0,
    Commit = 1,
}

/// A block header on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockHeaderPb {
    #[prost(uint32, tag = "1")]
    pub chain_id: u32,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    /// Milliseconds since the UNIX epoch.
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub prev_block_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub action_root: ::prost::alloc::vec::Vec<u8>,
    /// Producer address, hex form. Empty for dummy blocks.
    #[prost(string, tag = "6")]
    pub producer: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "7")]
    pub dkg_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub dkg_pubkey: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "9")]
    pub dkg_block_sig: ::prost::alloc::vec::Vec<u8>,
}

/// A block on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockPb {
    #[prost(message, optional, tag = "1")]
    pub header: ::core::option::Option<BlockHeaderPb>,
    #[prost(message, repeated, tag = "2")]
    pub actions: ::prost::alloc::vec::Vec<ActionPb>,
    #[prost(bytes = "vec", tag = "3")]
    pub producer_pub_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}

/// An action (transaction) on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionPb {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

/// Envelope for broadcast, tagging which consensus message is inside.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusPb {
    #[prost(oneof = "consensus_pb::Msg", tags = "1, 2, 3")]
    pub msg: ::core::option::Option<consensus_pb::Msg>,
}

/// Nested types for [`ConsensusPb`].
pub mod consensus_pb {
    /// The carried consensus message.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Msg {
        #[prost(message, tag = "1")]
        Propose(super::ProposePb),
        #[prost(message, tag = "2")]
        Endorse(super::EndorsePb),
        #[prost(message, tag = "3")]
        Block(super::BlockPb),
    }
}

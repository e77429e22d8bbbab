//! Wire messages for Roll-DPoS consensus.
//!
//! Protocol-buffer encodings of the three broadcast payloads (propose,
//! endorse, committed block) plus an envelope tagging which one is inside.
//! Message structs are hand-declared `prost` types; field numbers are part
//! of the protocol.

mod convert;
mod proto;

pub use convert::ConvertError;
pub use proto::{
    consensus_pb, ActionPb, BlockHeaderPb, BlockPb, ConsensusPb, EndorsePb, EndorsementTopic,
    ProposePb,
};

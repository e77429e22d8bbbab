//! Outbound broadcast messages.

use rolldpos_types::{Address, Block, Endorsement};

/// A message the consensus core hands to the broadcast layer.
///
/// The wire encoding (protocol buffers) lives in the messages crate; the
/// core deals in domain types only.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// A block proposal for the current round.
    Propose {
        /// Address of the proposing delegate.
        proposer: Address,
        /// The proposed block.
        block: Block,
    },
    /// A proposal- or commit-phase vote.
    Endorse(Endorsement),
    /// A freshly committed block.
    Block(Block),
}

impl OutboundMessage {
    /// Get the message type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Propose { .. } => "Propose",
            OutboundMessage::Endorse(_) => "Endorse",
            OutboundMessage::Block(_) => "Block",
        }
    }
}

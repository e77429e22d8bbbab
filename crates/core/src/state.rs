//! Consensus FSM states.

use std::fmt;

/// States of the Roll-DPoS consensus state machine.
///
/// The machine starts in [`EpochStart`](ConsensusState::EpochStart) and runs
/// indefinitely; there is no terminal state. A failed transition leaves the
/// machine in its prior state (handlers return an error instead of a
/// destination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsensusState {
    /// Waiting to join an epoch committee.
    EpochStart,
    /// In the committee; deriving this epoch's DKG material.
    DkgGeneration,
    /// Between rounds; waiting for the next round to begin.
    RoundStart,
    /// Local node is the proposer; about to mint.
    InitPropose,
    /// Waiting for a block proposal.
    AcceptPropose,
    /// Collecting proposal-phase endorsements.
    AcceptProposalEndorse,
    /// Collecting commit-phase endorsements.
    AcceptCommitEndorse,
}

impl ConsensusState {
    /// Every state, for building catch-all transitions.
    pub const ALL: [ConsensusState; 7] = [
        ConsensusState::EpochStart,
        ConsensusState::DkgGeneration,
        ConsensusState::RoundStart,
        ConsensusState::InitPropose,
        ConsensusState::AcceptPropose,
        ConsensusState::AcceptProposalEndorse,
        ConsensusState::AcceptCommitEndorse,
    ];

    /// Stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ConsensusState::EpochStart => "EpochStart",
            ConsensusState::DkgGeneration => "DkgGeneration",
            ConsensusState::RoundStart => "RoundStart",
            ConsensusState::InitPropose => "InitPropose",
            ConsensusState::AcceptPropose => "AcceptPropose",
            ConsensusState::AcceptProposalEndorse => "AcceptProposalEndorse",
            ConsensusState::AcceptCommitEndorse => "AcceptCommitEndorse",
        }
    }
}

impl fmt::Display for ConsensusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

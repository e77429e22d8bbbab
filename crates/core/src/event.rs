//! Events consumed by the consensus state machine.
//!
//! Events are **passive data**: they describe something that happened (a
//! wire message arrived, a timer expired, a self-scheduled step is due).
//! Every event carries the clock reading at creation time; the state machine
//! uses it to detect stale timeouts and to expire unmatched events.

use crate::state::ConsensusState;
use rolldpos_types::{Block, Endorsement};
use std::time::Duration;

/// Payload of a consensus event.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// Recompute the epoch committee.
    RollDelegates,
    /// Derive DKG material for this epoch.
    GenerateDkg,
    /// Begin a new proposal round.
    StartRound,
    /// Local node is proposer; mint a block.
    InitBlock,
    /// A block proposal arrived (local or remote).
    ProposeBlock(Box<Block>),
    /// A proposal-phase vote arrived.
    EndorseProposal(Box<Endorsement>),
    /// A commit-phase vote arrived.
    EndorseCommit(Box<Endorsement>),
    /// No proposal arrived in time.
    ProposeBlockTimeout,
    /// Not enough proposal endorsements arrived in time.
    EndorseProposalTimeout,
    /// Not enough commit endorsements arrived in time.
    EndorseCommitTimeout,
    /// End-of-round marker.
    FinishEpoch,
    /// Test-only forced transition into the carried state.
    Backdoor(ConsensusState),
}

/// Field-less tag of an [`EventKind`], used to key the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    RollDelegates,
    GenerateDkg,
    StartRound,
    InitBlock,
    ProposeBlock,
    EndorseProposal,
    EndorseCommit,
    ProposeBlockTimeout,
    EndorseProposalTimeout,
    EndorseCommitTimeout,
    FinishEpoch,
    Backdoor,
}

impl EventKind {
    /// The tag of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::RollDelegates => EventType::RollDelegates,
            EventKind::GenerateDkg => EventType::GenerateDkg,
            EventKind::StartRound => EventType::StartRound,
            EventKind::InitBlock => EventType::InitBlock,
            EventKind::ProposeBlock(_) => EventType::ProposeBlock,
            EventKind::EndorseProposal(_) => EventType::EndorseProposal,
            EventKind::EndorseCommit(_) => EventType::EndorseCommit,
            EventKind::ProposeBlockTimeout => EventType::ProposeBlockTimeout,
            EventKind::EndorseProposalTimeout => EventType::EndorseProposalTimeout,
            EventKind::EndorseCommitTimeout => EventType::EndorseCommitTimeout,
            EventKind::FinishEpoch => EventType::FinishEpoch,
            EventKind::Backdoor(_) => EventType::Backdoor,
        }
    }

    /// Get the event type name for logging.
    pub fn type_name(&self) -> &'static str {
        self.event_type().name()
    }
}

impl EventType {
    /// Stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EventType::RollDelegates => "RollDelegates",
            EventType::GenerateDkg => "GenerateDkg",
            EventType::StartRound => "StartRound",
            EventType::InitBlock => "InitBlock",
            EventType::ProposeBlock => "ProposeBlock",
            EventType::EndorseProposal => "EndorseProposal",
            EventType::EndorseCommit => "EndorseCommit",
            EventType::ProposeBlockTimeout => "ProposeBlockTimeout",
            EventType::EndorseProposalTimeout => "EndorseProposalTimeout",
            EventType::EndorseCommitTimeout => "EndorseCommitTimeout",
            EventType::FinishEpoch => "FinishEpoch",
            EventType::Backdoor => "Backdoor",
        }
    }

    /// Whether this is one of the scheduled timeout events.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            EventType::ProposeBlockTimeout
                | EventType::EndorseProposalTimeout
                | EventType::EndorseCommitTimeout
        )
    }
}

/// An event with the clock reading at creation time.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    timestamp: Duration,
}

impl Event {
    /// Create a new event stamped with `timestamp`.
    pub fn new(kind: EventKind, timestamp: Duration) -> Self {
        Self { kind, timestamp }
    }

    /// The payload.
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Consume the event, returning the payload.
    pub fn into_kind(self) -> EventKind {
        self.kind
    }

    /// Creation time (clock reading when the event was produced).
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// The tag of this event.
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// Whether this is a scheduled timeout event.
    pub fn is_timeout(&self) -> bool {
        self.event_type().is_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tags() {
        let evt = Event::new(EventKind::RollDelegates, Duration::from_secs(1));
        assert_eq!(evt.event_type(), EventType::RollDelegates);
        assert!(!evt.is_timeout());

        let evt = Event::new(EventKind::ProposeBlockTimeout, Duration::from_secs(1));
        assert!(evt.is_timeout());
        assert_eq!(evt.kind().type_name(), "ProposeBlockTimeout");
    }

    #[test]
    fn test_backdoor_carries_target() {
        let evt = Event::new(
            EventKind::Backdoor(ConsensusState::RoundStart),
            Duration::ZERO,
        );
        match evt.into_kind() {
            EventKind::Backdoor(target) => assert_eq!(target, ConsensusState::RoundStart),
            other => panic!("unexpected kind: {:?}", other),
        }
    }
}

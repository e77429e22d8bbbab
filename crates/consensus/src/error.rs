//! Consensus error types.

use crate::seed::SeedError;
use rolldpos_core::{ChainError, ConfigError, ConsensusState};
use thiserror::Error;

/// Errors returned by transition handlers.
///
/// A failed transition leaves the FSM in its prior state; the worker logs
/// the error and carries on. None of these are fatal.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The wrong event variant reached a handler.
    #[error("handler expected a {expected} event, got {got}")]
    EventCast {
        expected: &'static str,
        got: &'static str,
    },

    /// A chain collaborator call failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Epoch seed derivation failed.
    #[error(transparent)]
    Seed(#[from] SeedError),

    /// The candidate pool is smaller than the committee.
    #[error("{have} candidates for a committee of {need}")]
    NotEnoughCandidates { have: usize, need: usize },

    /// Proposer selection against an empty committee.
    #[error("epoch committee is empty")]
    EmptyCommittee,
}

/// Errors building the consensus FSM. Fatal: the node does not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmBuildError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two transitions registered for the same `(state, event)` pair.
    #[error("duplicate transition for ({state}, {event})")]
    DuplicateTransition {
        state: ConsensusState,
        event: &'static str,
    },

    /// Two catch-all transitions registered for the same event.
    #[error("duplicate catch-all transition for {event}")]
    DuplicateCatchAll { event: &'static str },

    /// A transition was registered from a state the table does not know.
    #[error("transition from unregistered state {state}")]
    UnregisteredState { state: ConsensusState },

    /// A transition declares a destination the table does not know.
    #[error("transition to unregistered destination {state}")]
    UnregisteredDestination { state: ConsensusState },
}

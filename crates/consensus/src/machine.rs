//! Data-driven transition table.
//!
//! The consensus transition table is data, not control flow: edges are keyed
//! by `(state, event type)` and map to a handler plus its declared
//! destination states. The builder rejects malformed tables (duplicate
//! edges, unregistered states) at construction time, which is the only
//! fatal error class in the core.

use crate::context::RollDposCtx;
use crate::error::{FsmBuildError, TransitionError};
use rolldpos_core::{ConsensusState, Event, EventType};
use std::collections::{HashMap, HashSet};

/// A transition handler: consumes the event, mutates the context, and
/// returns the destination state. An error means no transition occurred.
pub type HandlerFn = fn(&mut RollDposCtx, Event) -> Result<ConsensusState, TransitionError>;

/// One edge of the transition table.
pub(crate) struct Edge {
    pub(crate) handler: HandlerFn,
    pub(crate) destinations: Vec<ConsensusState>,
}

/// Immutable transition table.
pub struct TransitionTable {
    edges: HashMap<(ConsensusState, EventType), Edge>,
    catch_all: HashMap<EventType, Edge>,
}

impl TransitionTable {
    /// Find the edge for `(state, event_type)`, falling back to catch-all
    /// edges that apply from every state.
    pub(crate) fn lookup(&self, state: ConsensusState, event_type: EventType) -> Option<&Edge> {
        self.edges
            .get(&(state, event_type))
            .or_else(|| self.catch_all.get(&event_type))
    }
}

/// Builder for [`TransitionTable`].
pub struct TransitionTableBuilder {
    states: HashSet<ConsensusState>,
    transitions: Vec<(ConsensusState, EventType, HandlerFn, Vec<ConsensusState>)>,
    catch_all: Vec<(EventType, HandlerFn)>,
}

impl TransitionTableBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self {
            states: HashSet::new(),
            transitions: Vec::new(),
            catch_all: Vec::new(),
        }
    }

    /// Register the machine's states.
    pub fn add_states(mut self, states: &[ConsensusState]) -> Self {
        self.states.extend(states.iter().copied());
        self
    }

    /// Register a transition from `src` on `event_type`. The handler must
    /// return one of `destinations`.
    pub fn add_transition(
        mut self,
        src: ConsensusState,
        event_type: EventType,
        handler: HandlerFn,
        destinations: &[ConsensusState],
    ) -> Self {
        self.transitions
            .push((src, event_type, handler, destinations.to_vec()));
        self
    }

    /// Register a transition that applies from every registered state and
    /// may land in any of them.
    pub fn add_catch_all(mut self, event_type: EventType, handler: HandlerFn) -> Self {
        self.catch_all.push((event_type, handler));
        self
    }

    /// Validate and build the table.
    pub fn build(self) -> Result<TransitionTable, FsmBuildError> {
        let mut edges = HashMap::new();
        for (src, event_type, handler, destinations) in self.transitions {
            if !self.states.contains(&src) {
                return Err(FsmBuildError::UnregisteredState { state: src });
            }
            if let Some(unknown) = destinations.iter().find(|d| !self.states.contains(d)) {
                return Err(FsmBuildError::UnregisteredDestination { state: *unknown });
            }
            if edges
                .insert((src, event_type), Edge { handler, destinations })
                .is_some()
            {
                return Err(FsmBuildError::DuplicateTransition {
                    state: src,
                    event: event_type.name(),
                });
            }
        }

        let all_states: Vec<ConsensusState> = self.states.iter().copied().collect();
        let mut catch_all = HashMap::new();
        for (event_type, handler) in self.catch_all {
            if catch_all
                .insert(
                    event_type,
                    Edge {
                        handler,
                        destinations: all_states.clone(),
                    },
                )
                .is_some()
            {
                return Err(FsmBuildError::DuplicateCatchAll {
                    event: event_type.name(),
                });
            }
        }

        Ok(TransitionTable { edges, catch_all })
    }
}

impl Default for TransitionTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

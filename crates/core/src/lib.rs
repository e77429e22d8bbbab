//! Core abstractions for Roll-DPoS consensus.
//!
//! This crate provides the surface the consensus state machine is built on:
//!
//! - [`Event`] / [`EventKind`] / [`EventType`]: all possible inputs to the
//!   state machine
//! - [`ConsensusState`]: the machine's states
//! - [`Clock`]: injected time capability ([`SystemClock`] in production,
//!   [`FakeClock`] in tests)
//! - [`RollDposConfig`]: timing constants, committee sizing, liveness
//!   switches
//! - [`Chain`] / [`ActPool`] / [`P2p`]: collaborator traits
//! - [`OutboundMessage`]: broadcast payloads
//!
//! # Architecture
//!
//! The consensus core is a single-threaded cooperative state machine: one
//! worker drains a serialized event queue, dispatching each event to a
//! transition handler. Handlers are synchronous and deterministic; all I/O
//! goes through the collaborator traits, and all time reads go through the
//! clock handle.

mod clock;
mod config;
mod event;
mod message;
mod state;
mod traits;

pub use clock::{Clock, FakeClock, SleepFuture, SystemClock};
pub use config::{ConfigError, RollDposConfig};
pub use event::{Event, EventKind, EventType};
pub use message::OutboundMessage;
pub use state::ConsensusState;
pub use traits::{ActPool, Chain, ChainError, P2p, P2pError};

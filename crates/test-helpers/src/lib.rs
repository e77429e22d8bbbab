//! Deterministic fixtures and collaborator doubles for Roll-DPoS tests.
//!
//! - [`TestCommittee`]: seed-deterministic delegate keypairs and DKG shares
//! - [`MockChain`]: in-memory blockchain double
//! - [`RecordingP2p`]: broadcast double that records every message
//! - [`NoopActPool`]: action pool double counting resets

mod committee;
mod mocks;

pub use committee::{TestCommittee, TestDelegate};
pub use mocks::{MockChain, NoopActPool, RecordingP2p};

//! Roll-DPoS consensus core.
//!
//! A leader-rotated, epoch-structured BFT state machine driving block
//! proposal, two-phase endorsement (propose then commit), and block
//! finalization among a rolling committee of delegates.
//!
//! # Architecture
//!
//! [`ConsensusFsm`] owns a bounded event queue and a single worker task.
//! Inbound wire messages are decoded into events and enqueued through an
//! [`EventProducer`]; the worker dispatches each event through a data-driven
//! transition table into the handlers, which mutate [`RollDposCtx`] (epoch
//! and round state), call the chain / action-pool / broadcast collaborators,
//! and schedule timeouts on the injected clock.
//!
//! Lifecycle of one epoch: `RollDelegates` computes the committee from the
//! chain's candidates and the epoch seed (a BLS aggregate over the previous
//! epoch's DKG signatures, see [`SeedAggregator`]); `GenerateDkg` derives
//! the local DKG share; rounds then cycle through propose → proposal
//! endorsement → commit endorsement, with quorum at strictly more than two
//! thirds of the committee ([`QuorumCalculator`]), until the epoch's heights
//! are exhausted and `FinishEpoch` rolls the next committee.
//!
//! Liveness under failure: every phase has a timeout; a round with no commit
//! quorum commits a dummy block (when enabled) so height still advances, and
//! events that arrive before the machine can use them are redelivered until
//! a TTL expires.

mod context;
mod epoch;
mod error;
mod fsm;
mod handlers;
mod machine;
mod quorum;
mod round;
mod seed;

pub use context::RollDposCtx;
pub use epoch::{epoch_num_and_height, roll_candidates, EpochContext};
pub use error::{FsmBuildError, TransitionError};
pub use fsm::{ConsensusFsm, EventProducer};
pub use machine::{HandlerFn, TransitionTable, TransitionTableBuilder};
pub use quorum::QuorumCalculator;
pub use round::RoundContext;
pub use seed::{SeedAggregator, SeedError, DEFAULT_SEED_DEGREE};

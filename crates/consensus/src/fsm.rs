//! The consensus state machine driver.
//!
//! [`ConsensusFsm`] owns a bounded event queue and a single worker task that
//! drains it one event at a time. Anyone holding an [`EventProducer`] (the
//! network layer, chain subscribers, the handlers themselves) can enqueue
//! events; `produce` is the only synchronization point. Delayed events are
//! handled by short-lived tasks that sleep on the injected clock and then
//! enqueue, observing the shutdown signal so `stop` drains them cleanly.

use crate::context::RollDposCtx;
use crate::error::FsmBuildError;
use crate::handlers;
use crate::machine::{TransitionTable, TransitionTableBuilder};
use crate::seed::SeedAggregator;
use rolldpos_core::{
    ActPool, Chain, Clock, ConsensusState, Event, EventKind, EventType, P2p, RollDposConfig,
};
use rolldpos_types::KeyPair;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Handle for enqueuing consensus events.
///
/// Cheap to clone. Zero-delay produces are non-blocking; a full queue drops
/// the event with a warning rather than stalling the caller (the worker
/// producing into its own full queue must never deadlock).
#[derive(Clone)]
pub struct EventProducer {
    tx: mpsc::Sender<Event>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
    // Delayed producer tasks, shared across clones so `stop` can drain them
    tasks: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
}

impl EventProducer {
    /// Enqueue `kind` after `delay`, stamped with the current clock time.
    pub fn produce(&self, kind: EventKind, delay: Duration) {
        self.produce_event(Event::new(kind, self.clock.now()), delay);
    }

    /// Enqueue an existing event after `delay`, keeping its original
    /// timestamp. Used for redelivery.
    pub fn produce_event(&self, event: Event, delay: Duration) {
        if delay.is_zero() {
            if let Err(err) = self.tx.try_send(event) {
                warn!(error = %err, "event queue rejected event");
            }
            return;
        }

        let tx = self.tx.clone();
        let clock = Arc::clone(&self.clock);
        let mut shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            if *shutdown.borrow() {
                return;
            }
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = clock.sleep(delay) => {
                    let _ = tx.send(event).await;
                }
            }
        });

        let mut tasks = self.tasks.lock().expect("producer task list poisoned");
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

struct WorkerInner {
    ctx: RollDposCtx,
    table: TransitionTable,
    rx: mpsc::Receiver<Event>,
    state_tx: watch::Sender<ConsensusState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// The Roll-DPoS consensus state machine.
pub struct ConsensusFsm {
    producer: Option<EventProducer>,
    state_rx: watch::Receiver<ConsensusState>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
    worker: Option<JoinHandle<()>>,
    inner: Option<WorkerInner>,
    delay: Duration,
}

impl ConsensusFsm {
    /// Build the state machine. Fails on invalid configuration or a
    /// malformed transition table; either is fatal and the node must not
    /// run.
    pub fn new(
        cfg: RollDposConfig,
        keypair: KeyPair,
        chain: Arc<dyn Chain>,
        actpool: Arc<dyn ActPool>,
        p2p: Arc<dyn P2p>,
        clock: Arc<dyn Clock>,
        seed_aggregator: SeedAggregator,
    ) -> Result<Self, FsmBuildError> {
        cfg.validate()?;
        let table = build_transition_table()?;

        let (tx, rx) = mpsc::channel(cfg.event_chan_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConsensusState::EpochStart);
        let tasks = Arc::new(std::sync::Mutex::new(Vec::new()));

        let producer = EventProducer {
            tx,
            clock: Arc::clone(&clock),
            shutdown: shutdown_rx.clone(),
            tasks: Arc::clone(&tasks),
        };
        let delay = cfg.delay;
        let ctx = RollDposCtx::new(
            cfg,
            keypair,
            chain,
            actpool,
            p2p,
            clock,
            producer.clone(),
            seed_aggregator,
        );

        Ok(Self {
            producer: Some(producer),
            state_rx,
            shutdown_tx,
            tasks,
            worker: None,
            inner: Some(WorkerInner {
                ctx,
                table,
                rx,
                state_tx,
                shutdown_rx,
            }),
            delay,
        })
    }

    /// Start the worker and schedule the first `RollDelegates` after the
    /// startup grace period. Must be called inside a tokio runtime. A second
    /// call is a no-op.
    pub fn start(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        self.worker = Some(tokio::spawn(run_worker(inner)));
        self.produce(EventKind::RollDelegates, self.delay);
    }

    /// Signal shutdown, await the worker, and drain delayed producers. No
    /// in-flight event handler is interrupted; delayed producers observe the
    /// shutdown signal and exit without enqueuing.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
        self.producer = None;
        self.inner = None;
        let pending: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().expect("producer task list poisoned");
            tasks.drain(..).collect()
        };
        for task in pending {
            let _ = task.await;
        }
    }

    /// The state the machine is currently in.
    pub fn current_state(&self) -> ConsensusState {
        *self.state_rx.borrow()
    }

    /// Enqueue `kind` after `delay`. No-op after `stop`.
    pub fn produce(&self, kind: EventKind, delay: Duration) {
        if let Some(producer) = &self.producer {
            producer.produce(kind, delay);
        }
    }

    /// Enqueue an existing event after `delay`, keeping its timestamp.
    pub fn produce_event(&self, event: Event, delay: Duration) {
        if let Some(producer) = &self.producer {
            producer.produce_event(event, delay);
        }
    }

    /// A cloneable producer handle for external event sources.
    pub fn event_producer(&self) -> Option<EventProducer> {
        self.producer.clone()
    }
}

/// Assemble the Roll-DPoS transition table.
fn build_transition_table() -> Result<TransitionTable, FsmBuildError> {
    use ConsensusState::*;

    TransitionTableBuilder::new()
        .add_states(&ConsensusState::ALL)
        .add_transition(
            EpochStart,
            EventType::RollDelegates,
            handlers::handle_roll_delegates,
            &[EpochStart, DkgGeneration],
        )
        .add_transition(
            DkgGeneration,
            EventType::GenerateDkg,
            handlers::handle_generate_dkg,
            &[RoundStart],
        )
        .add_transition(
            RoundStart,
            EventType::StartRound,
            handlers::handle_start_round,
            &[InitPropose, AcceptPropose],
        )
        .add_transition(
            RoundStart,
            EventType::FinishEpoch,
            handlers::handle_finish_epoch,
            &[EpochStart, RoundStart],
        )
        .add_transition(
            InitPropose,
            EventType::InitBlock,
            handlers::handle_init_block,
            &[AcceptPropose],
        )
        .add_transition(
            AcceptPropose,
            EventType::ProposeBlock,
            handlers::handle_propose_block,
            // Stays on an invalid proposal, advances on a valid one
            &[AcceptPropose, AcceptProposalEndorse],
        )
        .add_transition(
            AcceptPropose,
            EventType::ProposeBlockTimeout,
            handlers::handle_propose_block_timeout,
            &[AcceptProposalEndorse],
        )
        .add_transition(
            AcceptProposalEndorse,
            EventType::EndorseProposal,
            handlers::handle_endorse_proposal,
            // Stays until agreement, then moves to the commit phase
            &[AcceptProposalEndorse, AcceptCommitEndorse],
        )
        .add_transition(
            AcceptProposalEndorse,
            EventType::EndorseProposalTimeout,
            handlers::handle_endorse_proposal_timeout,
            &[AcceptCommitEndorse],
        )
        .add_transition(
            AcceptCommitEndorse,
            EventType::EndorseCommit,
            handlers::handle_endorse_commit,
            // Stays until agreement, then wraps up the round
            &[AcceptCommitEndorse, RoundStart],
        )
        .add_transition(
            AcceptCommitEndorse,
            EventType::EndorseCommitTimeout,
            handlers::handle_endorse_commit_timeout,
            &[RoundStart],
        )
        .add_catch_all(EventType::Backdoor, handlers::handle_backdoor)
        .build()
}

/// Drain the event queue until shutdown.
async fn run_worker(mut inner: WorkerInner) {
    let mut shutdown = inner.shutdown_rx.clone();
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            maybe_event = inner.rx.recv() => {
                let Some(event) = maybe_event else {
                    break;
                };
                dispatch(&mut inner.ctx, &inner.table, &inner.state_tx, event);
                rolldpos_metrics::set_event_queue_depth(inner.rx.len());
            }
        }
    }
    debug!("consensus worker stopped");
}

/// Handle one event: staleness check, table lookup, redelivery of unmatched
/// events, and the transition itself.
fn dispatch(
    ctx: &mut RollDposCtx,
    table: &TransitionTable,
    state_tx: &watch::Sender<ConsensusState>,
    event: Event,
) {
    // A timeout stamped before the current round started belongs to a
    // previous round
    if event.is_timeout() && event.timestamp() < ctx.round.timestamp {
        debug!(evt = event.kind().type_name(), "stale timeout dropped");
        return;
    }

    let src = *state_tx.borrow();
    let event_type = event.event_type();

    let Some(edge) = table.lookup(src, event_type) else {
        // Endorsements routinely outrun their proposals; give young events
        // another chance
        let age = ctx.clock.now().saturating_sub(event.timestamp());
        if age <= ctx.cfg.unmatched_event_ttl {
            debug!(src = %src, evt = event_type.name(), "no transition matched, redelivering");
            ctx.producer
                .produce_event(event, ctx.cfg.unmatched_event_interval);
        } else {
            debug!(src = %src, evt = event_type.name(), "no transition matched, event expired");
        }
        return;
    };

    match (edge.handler)(ctx, event) {
        Ok(dst) => {
            if !edge.destinations.contains(&dst) {
                error!(
                    src = %src,
                    dst = %dst,
                    evt = event_type.name(),
                    "handler returned an undeclared destination; staying"
                );
                return;
            }
            state_tx.send_replace(dst);
            debug!(src = %src, dst = %dst, evt = event_type.name(), "state transition");
        }
        Err(err) => {
            error!(src = %src, evt = event_type.name(), error = %err, "state transition failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolldpos_core::FakeClock;
    use rolldpos_test_helpers::{MockChain, NoopActPool, RecordingP2p, TestCommittee};

    fn test_config() -> RollDposConfig {
        RollDposConfig::default()
            .with_num_delegates(4)
            .with_delay(Duration::ZERO)
    }

    fn make_fsm(candidates: usize) -> (ConsensusFsm, Arc<FakeClock>) {
        let committee = TestCommittee::new(4, 99);
        let clock = Arc::new(FakeClock::new(Duration::from_secs(10_000)));
        let candidates: Vec<_> = committee.addresses().into_iter().take(candidates).collect();
        let chain = Arc::new(MockChain::new(
            1,
            clock.clone(),
            committee.keypair(0).clone(),
            candidates,
            9_990_000,
        ));
        let fsm = ConsensusFsm::new(
            test_config(),
            committee.keypair(0).clone(),
            chain,
            Arc::new(NoopActPool::new()),
            Arc::new(RecordingP2p::new()),
            clock.clone(),
            SeedAggregator::with_degree(2),
        )
        .unwrap();
        (fsm, clock)
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_transition_table_builds() {
        assert!(build_transition_table().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let committee = TestCommittee::new(1, 1);
        let clock = Arc::new(FakeClock::new(Duration::ZERO));
        let chain = Arc::new(MockChain::new(
            1,
            clock.clone(),
            committee.keypair(0).clone(),
            committee.addresses(),
            0,
        ));
        let result = ConsensusFsm::new(
            RollDposConfig::default().with_num_delegates(0),
            committee.keypair(0).clone(),
            chain,
            Arc::new(NoopActPool::new()),
            Arc::new(RecordingP2p::new()),
            clock,
            SeedAggregator::new(),
        );
        assert!(matches!(result, Err(FsmBuildError::Config(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_initial_state_is_epoch_start() {
        let (fsm, _clock) = make_fsm(4);
        assert_eq!(fsm.current_state(), ConsensusState::EpochStart);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_not_enough_candidates_stays_in_epoch_start() {
        let (mut fsm, _clock) = make_fsm(2);
        fsm.start();
        settle().await;
        // rolling_delegates failed; the FSM stays put with a retry scheduled
        assert_eq!(fsm.current_state(), ConsensusState::EpochStart);
        fsm.stop().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_backdoor_forces_state() {
        let (mut fsm, _clock) = make_fsm(4);
        fsm.start();
        settle().await;

        fsm.produce(
            EventKind::Backdoor(ConsensusState::AcceptCommitEndorse),
            Duration::ZERO,
        );
        settle().await;
        assert_eq!(fsm.current_state(), ConsensusState::AcceptCommitEndorse);

        fsm.stop().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_stop_is_idempotent_and_drains() {
        // Two candidates keep the machine parked in EpochStart
        let (mut fsm, _clock) = make_fsm(2);
        fsm.start();
        // Schedule a delayed event; stop must not hang on it
        fsm.produce(EventKind::StartRound, Duration::from_secs(60));
        settle().await;
        fsm.stop().await;
        fsm.stop().await;
        assert_eq!(fsm.current_state(), ConsensusState::EpochStart);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_unmatched_event_expires_after_ttl() {
        let (mut fsm, clock) = make_fsm(2);
        fsm.start();
        settle().await;

        // FinishEpoch has no edge from EpochStart; stamp it older than the
        // redelivery TTL so it is dropped instead of requeued forever
        let expired = Event::new(
            EventKind::FinishEpoch,
            clock.now() - Duration::from_secs(60),
        );
        fsm.produce_event(expired, Duration::ZERO);
        settle().await;

        assert_eq!(fsm.current_state(), ConsensusState::EpochStart);
        fsm.stop().await;
    }
}

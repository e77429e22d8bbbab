//! Shared consensus context.
//!
//! [`RollDposCtx`] owns the per-epoch and per-round state and holds
//! capability handles to the collaborators (chain, action pool, broadcast,
//! clock) and to the FSM's own event queue. It is accessed only from the
//! worker task; handlers borrow it mutably one event at a time.

use crate::epoch::{epoch_num_and_height, roll_candidates, EpochContext};
use crate::error::TransitionError;
use crate::fsm::EventProducer;
use crate::quorum::QuorumCalculator;
use crate::round::RoundContext;
use crate::seed::{SeedAggregator, SeedError};
use rolldpos_core::{
    ActPool, Chain, ChainError, Clock, EventKind, OutboundMessage, P2p, RollDposConfig,
};
use rolldpos_types::{
    verify_bls, Address, Block, BlsPublicKey, BlsSignature, DkgMaterial, Endorsement, Hash,
    KeyPair, Topic,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Mutable state and capability handles of the consensus core.
pub struct RollDposCtx {
    pub(crate) cfg: RollDposConfig,
    pub(crate) keypair: KeyPair,
    pub(crate) addr: Address,
    pub(crate) chain: Arc<dyn Chain>,
    pub(crate) actpool: Arc<dyn ActPool>,
    pub(crate) p2p: Arc<dyn P2p>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) producer: EventProducer,
    pub(crate) seed_aggregator: SeedAggregator,
    pub(crate) epoch: EpochContext,
    pub(crate) round: RoundContext,
}

impl RollDposCtx {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        cfg: RollDposConfig,
        keypair: KeyPair,
        chain: Arc<dyn Chain>,
        actpool: Arc<dyn ActPool>,
        p2p: Arc<dyn P2p>,
        clock: Arc<dyn Clock>,
        producer: EventProducer,
        seed_aggregator: SeedAggregator,
    ) -> Self {
        let addr = keypair.address();
        Self {
            cfg,
            keypair,
            addr,
            chain,
            actpool,
            p2p,
            clock,
            producer,
            seed_aggregator,
            epoch: EpochContext::default(),
            round: RoundContext::default(),
        }
    }

    /// Enqueue an event after `delay`, stamped with the current clock time.
    pub(crate) fn produce(&self, kind: EventKind, delay: Duration) {
        self.producer.produce(kind, delay);
    }

    /// Current clock reading.
    pub(crate) fn now(&self) -> Duration {
        self.clock.now()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Epoch bookkeeping
    // ═══════════════════════════════════════════════════════════════════

    /// Epoch ordinal and start height for the next block to produce.
    pub(crate) fn calc_epoch_num_and_height(&self) -> (u64, u64) {
        epoch_num_and_height(
            self.chain.tip_height(),
            self.cfg.num_delegates,
            self.cfg.num_sub_epochs.max(1),
        )
    }

    /// Derive the epoch seed from the previous epoch's DKG blocks.
    pub(crate) fn update_seed(
        &self,
        epoch_num: u64,
        epoch_height: u64,
    ) -> Result<Vec<u8>, SeedError> {
        self.seed_aggregator.derive(
            self.chain.as_ref(),
            self.cfg.num_delegates,
            self.cfg.num_sub_epochs.max(1),
            epoch_num,
            epoch_height,
            &self.epoch.seed,
        )
    }

    /// Roll the committee for an epoch from the chain's candidate pool.
    pub(crate) fn rolling_delegates(
        &self,
        epoch_num: u64,
        seed: &[u8],
    ) -> Result<Vec<Address>, TransitionError> {
        let candidates = self.chain.candidates()?;
        if candidates.len() < self.cfg.num_delegates {
            return Err(TransitionError::NotEnoughCandidates {
                have: candidates.len(),
                need: self.cfg.num_delegates,
            });
        }
        Ok(roll_candidates(
            &candidates,
            epoch_num,
            seed,
            self.cfg.num_delegates,
        ))
    }

    /// Whether the local node is in `delegates`.
    pub(crate) fn is_delegate(&self, delegates: &[Address]) -> bool {
        delegates.contains(&self.addr)
    }

    /// Derive this epoch's DKG share for the local node.
    pub(crate) fn generate_dkg(&self) -> DkgMaterial {
        DkgMaterial::generate(self.addr.as_bytes().to_vec())
    }

    /// Whether the current epoch has produced all of its blocks.
    pub(crate) fn is_epoch_finished(&self) -> bool {
        self.chain.tip_height() >= self.epoch.last_height()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Round bookkeeping
    // ═══════════════════════════════════════════════════════════════════

    /// The proposer expected for `height` under the current committee.
    pub(crate) fn calc_proposer(&self, height: u64) -> Result<Address, TransitionError> {
        let delegates = &self.epoch.delegates;
        if delegates.is_empty() {
            return Err(TransitionError::EmptyCommittee);
        }
        let n = delegates.len() as u64;
        let slot = if self.cfg.time_based_rotation {
            let interval = self.cfg.proposer_interval;
            if interval.is_zero() {
                0
            } else {
                (self.duration_since_last_block().as_nanos() / interval.as_nanos()) as u64
            }
        } else {
            // A height below the epoch start never validates; slot 0 keeps
            // selection total so the height check reports the real error.
            height.checked_sub(self.epoch.height).unwrap_or(0)
        };
        Ok(delegates[(slot % n) as usize])
    }

    /// Proposer and height for the round about to start.
    pub(crate) fn rotated_proposer(&self) -> Result<(Address, u64), TransitionError> {
        let height = self.chain.tip_height() + 1;
        let proposer = self.calc_proposer(height)?;
        Ok((proposer, height))
    }

    /// Mint a block carrying this epoch's DKG signature over the seed.
    pub(crate) fn mint_block(&self) -> Result<Block, ChainError> {
        self.chain
            .mint_new_block(self.epoch.dkg.as_ref(), &self.epoch.seed)
    }

    /// Time elapsed since the last block was created.
    pub(crate) fn duration_since_last_block(&self) -> Duration {
        let last = match &self.round.block {
            Some(block) => block.header.timestamp(),
            None => self.chain.tip_block().header.timestamp(),
        };
        self.now().saturating_sub(last)
    }

    /// Schedule the next `StartRound` so rounds keep a steady cadence: fire
    /// immediately once `proposer_interval` has elapsed since the last
    /// block, otherwise wait out the remainder.
    pub(crate) fn produce_start_round(&self) {
        let elapsed = self.duration_since_last_block();
        if elapsed >= self.cfg.proposer_interval {
            self.produce(EventKind::StartRound, Duration::ZERO);
        } else {
            self.produce(EventKind::StartRound, self.cfg.proposer_interval - elapsed);
        }
    }

    /// Quorum calculator for the current committee.
    pub(crate) fn quorum(&self) -> QuorumCalculator {
        QuorumCalculator::new(self.epoch.delegates.len())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Outbound
    // ═══════════════════════════════════════════════════════════════════

    /// Broadcast a consensus message; failures are transient and only
    /// logged.
    pub(crate) fn broadcast(&self, msg: OutboundMessage) {
        let msg_type = msg.type_name();
        if let Err(err) = self.p2p.broadcast(self.chain.chain_id(), msg) {
            error!(error = %err, msg = msg_type, "broadcast failed");
        }
    }

    /// Build a signed endorsement for the current round.
    pub(crate) fn new_endorsement(
        &self,
        topic: Topic,
        block_hash: Hash,
        decision: bool,
    ) -> Endorsement {
        Endorsement::new_signed(self.round.height, block_hash, topic, decision, &self.keypair)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Validation
    // ═══════════════════════════════════════════════════════════════════

    /// Validate a proposed block for the current round.
    pub(crate) fn validate_propose_block(&self, block: &Block, expected_proposer: &Address) -> bool {
        let block_hash = block.hash_block();
        if block.height() != self.round.height {
            error!(
                expected_height = self.round.height,
                block_height = block.height(),
                block_hash = %block_hash,
                "proposed block height mismatch"
            );
            return false;
        }
        let producer = block.producer_address();
        if producer.is_nil() || producer != *expected_proposer {
            error!(
                expected_proposer = %expected_proposer,
                proposer = %producer,
                block_hash = %block_hash,
                "proposed block producer mismatch"
            );
            return false;
        }
        if !block.verify_signature() {
            error!(block_hash = %block_hash, "proposed block signature check failed");
            return false;
        }
        if producer == self.addr {
            // Self-proposed blocks were constructed locally
            return true;
        }
        if let Err(err) = self.chain.validate_block(block, true) {
            error!(error = %err, block_hash = %block_hash, "proposed block rejected by chain");
            return false;
        }
        if block.has_dkg() && !self.verify_dkg_signature(block) {
            error!(block_hash = %block_hash, "proposed block DKG signature check failed");
            return false;
        }
        true
    }

    /// Verify the block's DKG signature over the epoch seed.
    fn verify_dkg_signature(&self, block: &Block) -> bool {
        let Ok(pubkey) = BlsPublicKey::from_bytes(&block.header.dkg_pubkey) else {
            return false;
        };
        let Ok(signature) = BlsSignature::from_bytes(&block.header.dkg_block_sig) else {
            return false;
        };
        verify_bls(&self.epoch.seed, &pubkey, &signature)
    }

    /// Validate an endorsement before it reaches the tally.
    ///
    /// Checks phase, round height, committee membership, and the signature
    /// with its address binding.
    pub(crate) fn validate_endorsement(&self, en: &Endorsement, expected_topic: Topic) -> bool {
        if en.topic != expected_topic {
            error!(
                expected_topic = ?expected_topic,
                topic = ?en.topic,
                "endorsement phase mismatch"
            );
            return false;
        }
        if en.height != self.round.height {
            error!(
                expected_height = self.round.height,
                height = en.height,
                "endorsement height mismatch"
            );
            return false;
        }
        if !self.epoch.contains(&en.endorser) {
            warn!(endorser = %en.endorser, "endorsement from outside the committee");
            return false;
        }
        if !en.verify() {
            error!(endorser = %en.endorser, "endorsement signature check failed");
            return false;
        }
        true
    }
}

//! Per-round state and endorsement tallying.

use rolldpos_types::{Address, Block, Endorsement, Hash, Topic};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Per-round consensus state.
///
/// Created on every `StartRound`; timeout events stamped before
/// [`timestamp`](RoundContext::timestamp) belong to an earlier round and are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct RoundContext {
    /// Height this round is deciding.
    pub height: u64,
    /// Clock reading when the round started.
    pub timestamp: Duration,
    /// Expected proposer for this round.
    pub proposer: Address,
    /// The accepted proposal, once one validates.
    pub block: Option<Block>,
    proposal_endorsements: HashMap<Hash, HashMap<Address, bool>>,
    commit_endorsements: HashMap<Hash, HashMap<Address, bool>>,
}

impl RoundContext {
    /// Start a fresh round.
    pub fn new(height: u64, timestamp: Duration, proposer: Address) -> Self {
        Self {
            height,
            timestamp,
            proposer,
            block: None,
            proposal_endorsements: HashMap::new(),
            commit_endorsements: HashMap::new(),
        }
    }

    /// Record an endorsement in the tally for its phase and block hash.
    ///
    /// One decision per endorser per block: a repeated endorsement from the
    /// same address overwrites the previous decision (last write wins).
    pub fn record_endorsement(&mut self, endorsement: &Endorsement) {
        let tally = self
            .tally_mut(endorsement.topic)
            .entry(endorsement.block_hash)
            .or_default();
        if let Some(previous) = tally.insert(endorsement.endorser, endorsement.decision) {
            if previous != endorsement.decision {
                debug!(
                    endorser = %endorsement.endorser,
                    block_hash = %endorsement.block_hash,
                    decision = endorsement.decision,
                    "endorser changed its decision"
                );
            }
        }
    }

    /// The tally for a phase and block hash, if any votes arrived.
    pub fn tally(&self, topic: Topic, block_hash: &Hash) -> Option<&HashMap<Address, bool>> {
        match topic {
            Topic::Proposal => self.proposal_endorsements.get(block_hash),
            Topic::Commit => self.commit_endorsements.get(block_hash),
        }
    }

    /// Number of distinct block hashes endorsed in a phase. For logging.
    pub fn endorsed_block_count(&self, topic: Topic) -> usize {
        match topic {
            Topic::Proposal => self.proposal_endorsements.len(),
            Topic::Commit => self.commit_endorsements.len(),
        }
    }

    fn tally_mut(&mut self, topic: Topic) -> &mut HashMap<Hash, HashMap<Address, bool>> {
        match topic {
            Topic::Proposal => &mut self.proposal_endorsements,
            Topic::Commit => &mut self.commit_endorsements,
        }
    }
}

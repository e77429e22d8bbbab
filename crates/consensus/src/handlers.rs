//! Transition handlers.
//!
//! One function per edge of the transition table. Handlers are synchronous
//! and deterministic: they mutate the context, enqueue follow-up events,
//! hand outbound messages to the broadcast layer, and return the destination
//! state. Returning an error means no transition occurred.

use crate::context::RollDposCtx;
use crate::epoch::EpochContext;
use crate::error::TransitionError;
use crate::round::RoundContext;
use rolldpos_core::{ConsensusState, Event, EventKind, OutboundMessage};
use rolldpos_types::{Block, Topic};
use std::time::Duration;
use tracing::{info, warn};

/// `EpochStart` + `RollDelegates`: compute the epoch, derive its seed, and
/// roll the committee. Not being in the committee (or any failure) schedules
/// a retry after `delegate_interval`.
pub(crate) fn handle_roll_delegates(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let (epoch_num, epoch_height) = ctx.calc_epoch_num_and_height();

    let seed = match ctx.update_seed(epoch_num, epoch_height) {
        Ok(seed) => seed,
        Err(err) => {
            // Tolerate transient failures: check the delegate roll again later
            ctx.produce(EventKind::RollDelegates, ctx.cfg.delegate_interval);
            return Err(err.into());
        }
    };

    let delegates = match ctx.rolling_delegates(epoch_num, &seed) {
        Ok(delegates) => delegates,
        Err(err) => {
            ctx.produce(EventKind::RollDelegates, ctx.cfg.delegate_interval);
            return Err(err);
        }
    };

    if !ctx.is_delegate(&delegates) {
        info!(epoch = epoch_num, "current node is not in the committee");
        ctx.produce(EventKind::RollDelegates, ctx.cfg.delegate_interval);
        return Ok(ConsensusState::EpochStart);
    }

    ctx.epoch = EpochContext {
        num: epoch_num,
        height: epoch_height,
        delegates,
        num_sub_epochs: ctx.cfg.num_sub_epochs.max(1),
        dkg: None,
        seed,
    };
    rolldpos_metrics::set_epoch(epoch_num);
    info!(epoch = epoch_num, height = epoch_height, "current node is in the committee");

    ctx.produce(EventKind::GenerateDkg, Duration::ZERO);
    Ok(ConsensusState::DkgGeneration)
}

/// `DkgGeneration` + `GenerateDkg`: derive the epoch's DKG share and pace
/// the first round.
pub(crate) fn handle_generate_dkg(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    ctx.epoch.dkg = Some(ctx.generate_dkg());
    ctx.produce_start_round();
    Ok(ConsensusState::RoundStart)
}

/// `RoundStart` + `StartRound`: open a round for the next height. The
/// proposer mints; everyone else waits for a proposal with a timeout.
pub(crate) fn handle_start_round(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let (proposer, height) = ctx.rotated_proposer()?;
    ctx.round = RoundContext::new(height, ctx.now(), proposer);

    if proposer == ctx.addr {
        info!(proposer = %proposer, height, "current node is the proposer");
        ctx.produce(EventKind::InitBlock, Duration::ZERO);
        return Ok(ConsensusState::InitPropose);
    }

    info!(proposer = %proposer, height, "current node is not the proposer");
    ctx.produce(EventKind::ProposeBlockTimeout, ctx.cfg.accept_propose_ttl);
    Ok(ConsensusState::AcceptPropose)
}

/// `InitPropose` + `InitBlock`: mint a block, tell ourselves, tell the
/// network.
pub(crate) fn handle_init_block(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let block = ctx.mint_block()?;
    ctx.produce(
        EventKind::ProposeBlock(Box::new(block.clone())),
        Duration::ZERO,
    );
    ctx.broadcast(OutboundMessage::Propose {
        proposer: ctx.addr,
        block,
    });
    Ok(ConsensusState::AcceptPropose)
}

/// `AcceptPropose` + `ProposeBlock`: validate the proposal. A valid block is
/// adopted and endorsed; an invalid one leaves us waiting for the timeout.
pub(crate) fn handle_propose_block(
    ctx: &mut RollDposCtx,
    evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let got = evt.kind().type_name();
    let EventKind::ProposeBlock(block) = evt.into_kind() else {
        return Err(TransitionError::EventCast {
            expected: "ProposeBlock",
            got,
        });
    };

    ctx.round.block = None;
    let expected_proposer = ctx.calc_proposer(block.height())?;
    if !ctx.validate_propose_block(&block, &expected_proposer) {
        return Ok(ConsensusState::AcceptPropose);
    }

    let block_hash = block.hash_block();
    ctx.round.block = Some(*block);

    let endorsement = ctx.new_endorsement(Topic::Proposal, block_hash, true);
    ctx.produce(
        EventKind::EndorseProposal(Box::new(endorsement.clone())),
        Duration::ZERO,
    );
    ctx.broadcast(OutboundMessage::Endorse(endorsement));

    move_to_accept_proposal_endorse(ctx)
}

/// `AcceptPropose` + `ProposeBlockTimeout`: no valid proposal arrived; move
/// on and let the endorsement phases time out too.
pub(crate) fn handle_propose_block_timeout(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    warn!(
        proposer = %ctx.round.proposer,
        height = ctx.round.height,
        "didn't receive the proposed block before timeout"
    );
    move_to_accept_proposal_endorse(ctx)
}

/// `AcceptProposalEndorse` + `EndorseProposal`: tally the vote; on
/// agreement, cast our commit-phase vote.
pub(crate) fn handle_endorse_proposal(
    ctx: &mut RollDposCtx,
    evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let got = evt.kind().type_name();
    let EventKind::EndorseProposal(endorsement) = evt.into_kind() else {
        return Err(TransitionError::EventCast {
            expected: "EndorseProposal",
            got,
        });
    };

    if !ctx.validate_endorsement(&endorsement, Topic::Proposal) {
        return Ok(ConsensusState::AcceptProposalEndorse);
    }

    let block_hash = endorsement.block_hash;
    ctx.round.record_endorsement(&endorsement);
    let (yes, no) = match ctx.round.tally(Topic::Proposal, &block_hash) {
        Some(tally) => ctx.quorum().evaluate(tally),
        None => (false, false),
    };
    if !yes && !no {
        // Wait for more proposal endorsements to come
        return Ok(ConsensusState::AcceptProposalEndorse);
    }

    let commit = ctx.new_endorsement(Topic::Commit, block_hash, yes && !no);
    ctx.produce(
        EventKind::EndorseCommit(Box::new(commit.clone())),
        Duration::ZERO,
    );
    ctx.broadcast(OutboundMessage::Endorse(commit));

    move_to_accept_commit_endorse(ctx)
}

/// `AcceptProposalEndorse` + `EndorseProposalTimeout`: not enough proposal
/// endorsements; move to the commit phase empty-handed.
pub(crate) fn handle_endorse_proposal_timeout(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    warn!(
        height = ctx.round.height,
        endorsed_blocks = ctx.round.endorsed_block_count(Topic::Proposal),
        "didn't collect enough proposal endorsements before timeout"
    );
    move_to_accept_commit_endorse(ctx)
}

/// `AcceptCommitEndorse` + `EndorseCommit`: tally the vote; on agreement,
/// finish the round.
pub(crate) fn handle_endorse_commit(
    ctx: &mut RollDposCtx,
    evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let got = evt.kind().type_name();
    let EventKind::EndorseCommit(endorsement) = evt.into_kind() else {
        return Err(TransitionError::EventCast {
            expected: "EndorseCommit",
            got,
        });
    };

    if !ctx.validate_endorsement(&endorsement, Topic::Commit) {
        return Ok(ConsensusState::AcceptCommitEndorse);
    }

    let block_hash = endorsement.block_hash;
    ctx.round.record_endorsement(&endorsement);
    let (yes, no) = match ctx.round.tally(Topic::Commit, &block_hash) {
        Some(tally) => ctx.quorum().evaluate(tally),
        None => (false, false),
    };
    if !yes && !no {
        // Wait for more commit endorsements to come
        return Ok(ConsensusState::AcceptCommitEndorse);
    }

    process_endorse_commit(ctx, yes && !no)
}

/// `AcceptCommitEndorse` + `EndorseCommitTimeout`: no commit agreement in
/// time.
pub(crate) fn handle_endorse_commit_timeout(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    warn!(
        height = ctx.round.height,
        endorsed_blocks = ctx.round.endorsed_block_count(Topic::Commit),
        "didn't collect enough commit endorsements before timeout"
    );
    process_endorse_commit(ctx, false)
}

/// `RoundStart` + `FinishEpoch`: either roll into the next epoch or pace the
/// next round of this one.
pub(crate) fn handle_finish_epoch(
    ctx: &mut RollDposCtx,
    _evt: Event,
) -> Result<ConsensusState, TransitionError> {
    if ctx.is_epoch_finished() {
        info!(epoch = ctx.epoch.num, "epoch finished");
        ctx.produce(EventKind::RollDelegates, Duration::ZERO);
        return Ok(ConsensusState::EpochStart);
    }
    ctx.produce_start_round();
    Ok(ConsensusState::RoundStart)
}

/// Catch-all `Backdoor`: jump to the carried state. Test-only.
pub(crate) fn handle_backdoor(
    _ctx: &mut RollDposCtx,
    evt: Event,
) -> Result<ConsensusState, TransitionError> {
    let got = evt.kind().type_name();
    let EventKind::Backdoor(target) = evt.into_kind() else {
        return Err(TransitionError::EventCast {
            expected: "Backdoor",
            got,
        });
    };
    Ok(target)
}

/// Schedule the proposal-endorsement timeout and enter that phase.
fn move_to_accept_proposal_endorse(
    ctx: &mut RollDposCtx,
) -> Result<ConsensusState, TransitionError> {
    ctx.produce(
        EventKind::EndorseProposalTimeout,
        ctx.cfg.accept_proposal_endorse_ttl,
    );
    Ok(ConsensusState::AcceptProposalEndorse)
}

/// Schedule the commit-endorsement timeout and enter that phase.
fn move_to_accept_commit_endorse(ctx: &mut RollDposCtx) -> Result<ConsensusState, TransitionError> {
    ctx.produce(
        EventKind::EndorseCommitTimeout,
        ctx.cfg.accept_commit_endorse_ttl,
    );
    Ok(ConsensusState::AcceptCommitEndorse)
}

/// Close out the round: commit the agreed block (or a dummy block when
/// agreement failed and dummy blocks are enabled), reset the action pool,
/// broadcast the committed block, and fire `FinishEpoch`.
fn process_endorse_commit(
    ctx: &mut RollDposCtx,
    consensus: bool,
) -> Result<ConsensusState, TransitionError> {
    let height = ctx.round.height;
    rolldpos_metrics::record_consensus_result(consensus);

    let pending: Option<Block> = if consensus {
        info!(height, "consensus reached");
        ctx.round.block.clone()
    } else {
        warn!(height, "consensus not reached");
        if ctx.cfg.enable_dummy_block {
            let dummy = ctx.chain.mint_new_dummy_block();
            warn!(height = dummy.height(), "dummy block generated");
            rolldpos_metrics::record_dummy_block();
            Some(dummy)
        } else {
            None
        }
    };

    if let Some(block) = pending {
        if let Err(err) = ctx.chain.commit_block(&block) {
            // The next epoch check recovers from the chain tip
            tracing::error!(
                error = %err,
                height = block.height(),
                dummy = block.is_dummy(),
                "error when committing a block"
            );
        } else {
            rolldpos_metrics::set_block_height(block.height());
        }
        // Remove committed actions and reset pool state
        ctx.actpool.reset();
        ctx.broadcast(OutboundMessage::Block(block));
    }

    ctx.produce(EventKind::FinishEpoch, Duration::ZERO);
    Ok(ConsensusState::RoundStart)
}

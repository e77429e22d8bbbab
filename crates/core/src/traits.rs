//! Collaborator traits.
//!
//! The consensus core drives three external collaborators through narrow
//! synchronous interfaces: the blockchain, the action pool, and the
//! broadcast layer. Implementations manage their own synchronization and
//! must be safe to call from the FSM worker; calls must not block longer
//! than a round's timeout.

use crate::message::OutboundMessage;
use rolldpos_types::{Address, Block, DkgMaterial};
use thiserror::Error;

/// Blockchain collaborator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("block at height {0} not found")]
    BlockNotFound(u64),
    #[error("block validation failed: {0}")]
    Validation(String),
    #[error("block commit failed: {0}")]
    Commit(String),
    #[error("minting failed: {0}")]
    Mint(String),
    #[error("candidate pool unavailable: {0}")]
    Candidates(String),
}

/// The blockchain collaborator.
pub trait Chain: Send + Sync {
    /// Identifier of the chain this node participates in.
    fn chain_id(&self) -> u32;

    /// Height of the last committed block.
    fn tip_height(&self) -> u64;

    /// The last committed block.
    fn tip_block(&self) -> Block;

    /// Fetch a committed block by height.
    fn get_block_by_height(&self, height: u64) -> Result<Block, ChainError>;

    /// Current delegate candidates, ranked by stake.
    fn candidates(&self) -> Result<Vec<Address>, ChainError>;

    /// Validate a proposed block. `include_actions` also validates the
    /// carried actions against chain state.
    fn validate_block(&self, block: &Block, include_actions: bool) -> Result<(), ChainError>;

    /// Commit a block to the chain.
    fn commit_block(&self, block: &Block) -> Result<(), ChainError>;

    /// Mint a new block at the next height. When the minter carries DKG
    /// material, its signature over the epoch seed is embedded in the
    /// header.
    fn mint_new_block(
        &self,
        dkg: Option<&DkgMaterial>,
        seed: &[u8],
    ) -> Result<Block, ChainError>;

    /// Mint a dummy block at the next height: no actions, nil producer.
    fn mint_new_dummy_block(&self) -> Block;
}

/// Broadcast layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum P2pError {
    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

/// The peer-to-peer broadcast collaborator. Best-effort; the core never
/// needs unicast.
pub trait P2p: Send + Sync {
    /// Broadcast a consensus message to the network.
    fn broadcast(&self, chain_id: u32, msg: OutboundMessage) -> Result<(), P2pError>;
}

/// The action pool collaborator.
pub trait ActPool: Send + Sync {
    /// Purge just-committed actions and reset pool state.
    fn reset(&self);
}

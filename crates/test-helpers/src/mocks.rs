//! In-memory collaborator doubles.

use rolldpos_core::{ActPool, Chain, ChainError, Clock, OutboundMessage, P2p, P2pError};
use rolldpos_types::{Address, Block, BlockHeader, DkgMaterial, Hash, KeyPair, Topic};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory blockchain double.
///
/// Holds a vector of committed blocks starting from a genesis dummy block at
/// height 0. Minting signs with the configured producer keypair and stamps
/// the injected clock's time.
pub struct MockChain {
    chain_id: u32,
    clock: Arc<dyn Clock>,
    minter: KeyPair,
    candidates: Vec<Address>,
    inner: Mutex<ChainInner>,
}

struct ChainInner {
    blocks: Vec<Block>,
    commits: usize,
}

impl MockChain {
    /// Create a chain with a genesis dummy block at height 0.
    pub fn new(
        chain_id: u32,
        clock: Arc<dyn Clock>,
        minter: KeyPair,
        candidates: Vec<Address>,
        genesis_timestamp_ms: u64,
    ) -> Self {
        let genesis = Block::new_dummy(chain_id, 0, genesis_timestamp_ms, Hash::ZERO);
        Self {
            chain_id,
            clock,
            minter,
            candidates,
            inner: Mutex::new(ChainInner {
                blocks: vec![genesis],
                commits: 0,
            }),
        }
    }

    /// Blocks committed after genesis.
    pub fn committed_blocks(&self) -> Vec<Block> {
        self.inner.lock().unwrap().blocks[1..].to_vec()
    }

    /// Number of `commit_block` calls.
    pub fn commit_count(&self) -> usize {
        self.inner.lock().unwrap().commits
    }

    /// Append a block without counting it as a consensus commit. Used to
    /// seed chain history.
    pub fn push_block(&self, block: Block) {
        self.inner.lock().unwrap().blocks.push(block);
    }

    fn now_ms(&self) -> u64 {
        self.clock.now().as_millis() as u64
    }
}

impl Chain for MockChain {
    fn chain_id(&self) -> u32 {
        self.chain_id
    }

    fn tip_height(&self) -> u64 {
        self.inner.lock().unwrap().blocks.last().expect("genesis always present").height()
    }

    fn tip_block(&self) -> Block {
        self.inner.lock().unwrap().blocks.last().expect("genesis always present").clone()
    }

    fn get_block_by_height(&self, height: u64) -> Result<Block, ChainError> {
        self.inner
            .lock()
            .unwrap()
            .blocks
            .iter()
            .find(|b| b.height() == height)
            .cloned()
            .ok_or(ChainError::BlockNotFound(height))
    }

    fn candidates(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.candidates.clone())
    }

    fn validate_block(&self, _block: &Block, _include_actions: bool) -> Result<(), ChainError> {
        Ok(())
    }

    fn commit_block(&self, block: &Block) -> Result<(), ChainError> {
        let mut inner = self.inner.lock().unwrap();
        let tip = inner.blocks.last().expect("genesis always present").height();
        if block.height() != tip + 1 {
            return Err(ChainError::Commit(format!(
                "non-contiguous commit: tip {}, block {}",
                tip,
                block.height()
            )));
        }
        inner.blocks.push(block.clone());
        inner.commits += 1;
        Ok(())
    }

    fn mint_new_block(
        &self,
        dkg: Option<&DkgMaterial>,
        seed: &[u8],
    ) -> Result<Block, ChainError> {
        let (height, prev_block_hash) = {
            let inner = self.inner.lock().unwrap();
            let tip = inner.blocks.last().expect("genesis always present");
            (tip.height() + 1, tip.hash_block())
        };
        let (dkg_id, dkg_pubkey, dkg_block_sig) = match dkg {
            Some(material) => (
                material.id.clone(),
                material.public_key.as_bytes().to_vec(),
                material.sign_seed(seed).as_bytes().to_vec(),
            ),
            None => (Vec::new(), Vec::new(), Vec::new()),
        };
        let header = BlockHeader {
            chain_id: self.chain_id,
            height,
            timestamp_ms: self.now_ms(),
            prev_block_hash,
            action_root: Hash::ZERO,
            producer: self.minter.address(),
            dkg_id,
            dkg_pubkey,
            dkg_block_sig,
        };
        Ok(Block::new_signed(header, Vec::new(), &self.minter))
    }

    fn mint_new_dummy_block(&self) -> Block {
        let inner = self.inner.lock().unwrap();
        let tip = inner.blocks.last().expect("genesis always present");
        Block::new_dummy(self.chain_id, tip.height() + 1, self.now_ms(), tip.hash_block())
    }
}

/// Broadcast double that records every message.
#[derive(Default)]
pub struct RecordingP2p {
    sent: Mutex<Vec<(u32, OutboundMessage)>>,
}

impl RecordingP2p {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages, in broadcast order.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Count recorded endorsements of a given phase.
    pub fn endorsement_count(&self, topic: Topic) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| matches!(m, OutboundMessage::Endorse(en) if en.topic == topic))
            .count()
    }

    /// Count recorded block proposals.
    pub fn propose_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| matches!(m, OutboundMessage::Propose { .. }))
            .count()
    }

    /// Drop all recorded messages.
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl P2p for RecordingP2p {
    fn broadcast(&self, chain_id: u32, msg: OutboundMessage) -> Result<(), P2pError> {
        self.sent.lock().unwrap().push((chain_id, msg));
        Ok(())
    }
}

/// Action pool double counting resets.
#[derive(Default)]
pub struct NoopActPool {
    resets: AtomicUsize,
}

impl NoopActPool {
    /// Create a pool double.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `reset` calls.
    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ActPool for NoopActPool {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestCommittee;
    use rolldpos_core::FakeClock;
    use std::time::Duration;

    fn chain_with(committee: &TestCommittee) -> MockChain {
        let clock = Arc::new(FakeClock::new(Duration::from_secs(1_000)));
        MockChain::new(
            1,
            clock,
            committee.keypair(0).clone(),
            committee.addresses(),
            999_000,
        )
    }

    #[test]
    fn test_mint_advances_from_tip() {
        let committee = TestCommittee::new(4, 7);
        let chain = chain_with(&committee);

        assert_eq!(chain.tip_height(), 0);
        let block = chain.mint_new_block(Some(committee.dkg(0)), b"seed").unwrap();
        assert_eq!(block.height(), 1);
        assert!(block.verify_signature());
        assert!(block.has_dkg());

        chain.commit_block(&block).unwrap();
        assert_eq!(chain.tip_height(), 1);
        assert_eq!(chain.commit_count(), 1);
    }

    #[test]
    fn test_non_contiguous_commit_rejected() {
        let committee = TestCommittee::new(4, 7);
        let chain = chain_with(&committee);
        let block = chain.mint_new_block(None, &[]).unwrap();
        chain.commit_block(&block).unwrap();
        assert!(chain.commit_block(&block).is_err());
    }

    #[test]
    fn test_dummy_mint() {
        let committee = TestCommittee::new(4, 7);
        let chain = chain_with(&committee);
        let dummy = chain.mint_new_dummy_block();
        assert!(dummy.is_dummy());
        assert_eq!(dummy.height(), 1);
    }
}

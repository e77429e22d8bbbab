//! Epoch seed derivation.
//!
//! The seed of epoch N+1 is the BLS aggregate of the DKG signatures carried
//! by the first qualifying blocks of epoch N. Each of those signatures was
//! produced over epoch N's own seed, so the aggregate both commits to the
//! previous randomness and is unpredictable until the blocks exist.

use rolldpos_core::Chain;
use rolldpos_types::{
    aggregate_bls_signatures, verify_bls_aggregate, BlsPublicKey, BlsSignature, CryptoError,
};
use thiserror::Error;
use tracing::debug;

/// Protocol DKG polynomial degree; `degree + 1` shares reconstruct.
pub const DEFAULT_SEED_DEGREE: usize = 10;

/// Seed derivation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    /// The previous epoch's window held too few DKG-bearing blocks.
    #[error("only {have} DKG-bearing blocks in the epoch window, need {need}")]
    NotEnoughDkgBlocks { have: usize, need: usize },

    /// Signature aggregation failed.
    #[error("failed to aggregate DKG signatures: {0}")]
    Aggregation(#[from] CryptoError),

    /// The aggregate does not verify against the previous seed.
    #[error("aggregate signature does not verify against the previous seed")]
    Verification,
}

/// Derives the next epoch's randomness seed.
#[derive(Debug, Clone)]
pub struct SeedAggregator {
    degree: usize,
}

impl Default for SeedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedAggregator {
    /// Aggregator with the protocol degree.
    pub fn new() -> Self {
        Self {
            degree: DEFAULT_SEED_DEGREE,
        }
    }

    /// Aggregator with a custom degree, for small test committees.
    pub fn with_degree(degree: usize) -> Self {
        Self { degree }
    }

    /// Derive the seed for `epoch_num` starting at `epoch_height`.
    ///
    /// For the first epochs (`epoch_num <= 1`) there is no previous DKG
    /// material and the seed is empty. Otherwise the previous epoch's
    /// heights are scanned in order and the first `degree + 1` blocks
    /// carrying complete DKG material contribute their signatures; the
    /// verified aggregate is the new seed.
    pub fn derive(
        &self,
        chain: &dyn Chain,
        num_delegates: usize,
        num_sub_epochs: u32,
        epoch_num: u64,
        epoch_height: u64,
        previous_seed: &[u8],
    ) -> Result<Vec<u8>, SeedError> {
        if epoch_num <= 1 {
            return Ok(Vec::new());
        }

        let need = self.degree + 1;
        let end_height = epoch_height - 1;
        let start_height = num_delegates as u64 * num_sub_epochs as u64 * (epoch_num - 2) + 1;

        let mut signatures: Vec<BlsSignature> = Vec::with_capacity(need);
        let mut pubkeys: Vec<BlsPublicKey> = Vec::with_capacity(need);

        for height in start_height..=end_height {
            if signatures.len() >= need {
                break;
            }
            let Ok(block) = chain.get_block_by_height(height) else {
                continue;
            };
            if block.header.dkg_id.is_empty() || !block.has_dkg() {
                continue;
            }
            let Ok(pubkey) = BlsPublicKey::from_bytes(&block.header.dkg_pubkey) else {
                debug!(height, "skipping block with malformed DKG public key");
                continue;
            };
            let Ok(signature) = BlsSignature::from_bytes(&block.header.dkg_block_sig) else {
                debug!(height, "skipping block with malformed DKG signature");
                continue;
            };
            pubkeys.push(pubkey);
            signatures.push(signature);
        }

        if signatures.len() < need {
            return Err(SeedError::NotEnoughDkgBlocks {
                have: signatures.len(),
                need,
            });
        }

        let aggregate = aggregate_bls_signatures(&signatures)?;
        if !verify_bls_aggregate(previous_seed, &pubkeys, &aggregate) {
            return Err(SeedError::Verification);
        }
        Ok(aggregate.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolldpos_core::FakeClock;
    use rolldpos_test_helpers::{MockChain, TestCommittee};
    use std::sync::Arc;
    use std::time::Duration;

    fn seeded_chain(committee: &TestCommittee, dkg_heights: &[u64], signed_seed: &[u8]) -> MockChain {
        let clock = Arc::new(FakeClock::new(Duration::from_secs(1_000)));
        let chain = MockChain::new(
            1,
            clock,
            committee.keypair(0).clone(),
            committee.addresses(),
            0,
        );
        let mut prev = chain.tip_block().hash_block();
        for height in 1..=4u64 {
            let block = if dkg_heights.contains(&height) {
                committee.make_dkg_block(
                    (height as usize - 1) % committee.len(),
                    1,
                    height,
                    height * 1_000,
                    prev,
                    signed_seed,
                )
            } else {
                rolldpos_types::Block::new_dummy(1, height, height * 1_000, prev)
            };
            prev = block.hash_block();
            chain.push_block(block);
        }
        chain
    }

    #[test]
    fn test_first_epochs_have_empty_seed() {
        let committee = TestCommittee::new(4, 1);
        let chain = seeded_chain(&committee, &[], b"");
        let aggregator = SeedAggregator::with_degree(2);

        assert_eq!(
            aggregator.derive(&chain, 4, 1, 1, 1, b"").unwrap(),
            Vec::<u8>::new()
        );
        assert_eq!(
            aggregator.derive(&chain, 4, 1, 0, 1, b"").unwrap(),
            Vec::<u8>::new()
        );
    }

    #[test]
    fn test_derives_verified_aggregate() {
        let committee = TestCommittee::new(4, 1);
        // Epoch 1 (heights 1..=4), every block carries DKG over the empty seed
        let chain = seeded_chain(&committee, &[1, 2, 3, 4], b"");
        let aggregator = SeedAggregator::with_degree(2);

        let seed = aggregator.derive(&chain, 4, 1, 2, 5, b"").unwrap();
        assert!(!seed.is_empty());

        // Deterministic: the same window yields the same seed
        let again = aggregator.derive(&chain, 4, 1, 2, 5, b"").unwrap();
        assert_eq!(seed, again);
    }

    #[test]
    fn test_skips_blocks_without_dkg() {
        let committee = TestCommittee::new(4, 1);
        // Only three DKG-bearing blocks; degree 2 needs exactly three
        let chain = seeded_chain(&committee, &[1, 3, 4], b"");
        let aggregator = SeedAggregator::with_degree(2);
        assert!(aggregator.derive(&chain, 4, 1, 2, 5, b"").is_ok());
    }

    #[test]
    fn test_not_enough_dkg_blocks_fails() {
        let committee = TestCommittee::new(4, 1);
        let chain = seeded_chain(&committee, &[1, 2], b"");
        let aggregator = SeedAggregator::with_degree(2);

        assert_eq!(
            aggregator.derive(&chain, 4, 1, 2, 5, b""),
            Err(SeedError::NotEnoughDkgBlocks { have: 2, need: 3 })
        );
    }

    #[test]
    fn test_wrong_previous_seed_fails_verification() {
        let committee = TestCommittee::new(4, 1);
        let chain = seeded_chain(&committee, &[1, 2, 3, 4], b"");
        let aggregator = SeedAggregator::with_degree(2);

        // Blocks signed the empty seed; verifying against another fails
        assert_eq!(
            aggregator.derive(&chain, 4, 1, 2, 5, b"wrong"),
            Err(SeedError::Verification)
        );
    }
}

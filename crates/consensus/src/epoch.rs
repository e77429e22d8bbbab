//! Per-epoch state and epoch arithmetic.

use rolldpos_types::{Address, DkgMaterial, Hash};

/// Per-epoch consensus state.
///
/// Built on `RollDelegates` when the local node joins a committee; replaced
/// wholesale when the next epoch begins.
#[derive(Debug, Clone, Default)]
pub struct EpochContext {
    /// Epoch ordinal, starting at 1.
    pub num: u64,
    /// First block height of the epoch.
    pub height: u64,
    /// Ordered committee for this epoch.
    pub delegates: Vec<Address>,
    /// Rounds per delegate slot.
    pub num_sub_epochs: u32,
    /// Local node's DKG share, set after `GenerateDkg`.
    pub dkg: Option<DkgMaterial>,
    /// Epoch randomness. Empty for the first epochs.
    pub seed: Vec<u8>,
}

impl EpochContext {
    /// Whether `address` is in this epoch's committee.
    pub fn contains(&self, address: &Address) -> bool {
        self.delegates.contains(address)
    }

    /// Last block height of the epoch.
    pub fn last_height(&self) -> u64 {
        let span = self.delegates.len() as u64 * self.num_sub_epochs as u64;
        self.height + span.saturating_sub(1)
    }
}

/// Epoch ordinal and start height for a chain tip.
///
/// An epoch spans `num_delegates * num_sub_epochs` heights; the next block
/// to produce (`tip + 1`) falls inside the returned epoch.
pub fn epoch_num_and_height(tip_height: u64, num_delegates: usize, num_sub_epochs: u32) -> (u64, u64) {
    let span = num_delegates as u64 * num_sub_epochs as u64;
    let num = tip_height / span + 1;
    let height = (num - 1) * span + 1;
    (num, height)
}

/// Roll the committee for an epoch.
///
/// Candidates are ordered by `BLAKE2b-256(seed || epoch_num || address)` and
/// the first `num_delegates` are taken, so committee membership and order
/// rotate with the epoch randomness.
pub fn roll_candidates(
    candidates: &[Address],
    epoch_num: u64,
    seed: &[u8],
    num_delegates: usize,
) -> Vec<Address> {
    let mut ranked: Vec<(Hash, Address)> = candidates
        .iter()
        .map(|address| {
            (
                Hash::from_parts(&[seed, &epoch_num.to_le_bytes(), address.as_bytes()]),
                *address,
            )
        })
        .collect();
    ranked.sort();
    ranked
        .into_iter()
        .take(num_delegates)
        .map(|(_, address)| address)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolldpos_types::KeyPair;

    fn addresses(n: usize) -> Vec<Address> {
        (0..n)
            .map(|i| {
                let mut seed = [0u8; 32];
                seed[0] = i as u8;
                KeyPair::from_seed(&seed).address()
            })
            .collect()
    }

    #[test]
    fn test_epoch_arithmetic() {
        // 4 delegates, 1 sub-epoch: epochs span 4 heights
        assert_eq!(epoch_num_and_height(0, 4, 1), (1, 1));
        assert_eq!(epoch_num_and_height(3, 4, 1), (1, 1));
        assert_eq!(epoch_num_and_height(4, 4, 1), (2, 5));
        assert_eq!(epoch_num_and_height(8, 4, 1), (3, 9));

        // 2 sub-epochs double the span
        assert_eq!(epoch_num_and_height(7, 4, 2), (1, 1));
        assert_eq!(epoch_num_and_height(8, 4, 2), (2, 9));
    }

    #[test]
    fn test_last_height() {
        let epoch = EpochContext {
            num: 2,
            height: 5,
            delegates: addresses(4),
            num_sub_epochs: 1,
            ..Default::default()
        };
        assert_eq!(epoch.last_height(), 8);
    }

    #[test]
    fn test_roll_is_deterministic() {
        let candidates = addresses(8);
        let a = roll_candidates(&candidates, 3, b"seed", 4);
        let b = roll_candidates(&candidates, 3, b"seed", 4);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_roll_rotates_with_epoch_and_seed() {
        let candidates = addresses(8);
        let base = roll_candidates(&candidates, 3, b"seed", 8);
        let other_epoch = roll_candidates(&candidates, 4, b"seed", 8);
        let other_seed = roll_candidates(&candidates, 3, b"other", 8);

        // Same membership when the committee takes everyone, different order
        assert_ne!(base, other_epoch);
        assert_ne!(base, other_seed);

        let mut sorted_base = base.clone();
        let mut sorted_other = other_epoch.clone();
        sorted_base.sort();
        sorted_other.sort();
        assert_eq!(sorted_base, sorted_other);
    }

    #[test]
    fn test_committee_contains() {
        let delegates = addresses(4);
        let outsider = addresses(5)[4];
        let epoch = EpochContext {
            delegates: delegates.clone(),
            ..Default::default()
        };
        assert!(epoch.contains(&delegates[2]));
        assert!(!epoch.contains(&outsider));
    }
}

//! Quorum arithmetic.

use rolldpos_types::Address;
use std::collections::HashMap;

/// Maps an endorsement tally to yes/no agreement flags.
///
/// Agreement requires strictly more than two thirds of the committee:
/// `2n/3 + 1` same-decision votes, computed in integer arithmetic (3 of 4,
/// 15 of 21). Both flags false means no agreement yet; both true cannot
/// happen because each endorser holds exactly one decision.
#[derive(Debug, Clone, Copy)]
pub struct QuorumCalculator {
    committee_size: usize,
}

impl QuorumCalculator {
    /// Calculator for a committee of `committee_size`.
    pub fn new(committee_size: usize) -> Self {
        Self { committee_size }
    }

    /// Votes required for agreement.
    pub fn threshold(&self) -> usize {
        2 * self.committee_size / 3 + 1
    }

    /// Evaluate a tally: `(yes, no)` agreement flags.
    pub fn evaluate(&self, tally: &HashMap<Address, bool>) -> (bool, bool) {
        let threshold = self.threshold();
        let yes = tally.values().filter(|decision| **decision).count();
        let no = tally.len() - yes;
        (yes >= threshold, no >= threshold)
    }
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

    fn tally(addrs: &[Address], decisions: &[bool]) -> HashMap<Address, bool> {
        addrs.iter().copied().zip(decisions.iter().copied()).collect()
    }

    #[test]
    fn test_threshold_values() {
        assert_eq!(QuorumCalculator::new(4).threshold(), 3);
        assert_eq!(QuorumCalculator::new(21).threshold(), 15);
        assert_eq!(QuorumCalculator::new(3).threshold(), 3);
        assert_eq!(QuorumCalculator::new(1).threshold(), 1);
    }

    #[test]
    fn test_yes_quorum_of_four() {
        let addrs = addresses(4);
        let calc = QuorumCalculator::new(4);

        let (yes, no) = calc.evaluate(&tally(&addrs[..2], &[true, true]));
        assert!(!yes && !no);

        let (yes, no) = calc.evaluate(&tally(&addrs[..3], &[true, true, true]));
        assert!(yes && !no);
    }

    #[test]
    fn test_no_quorum_of_four() {
        let addrs = addresses(4);
        let calc = QuorumCalculator::new(4);

        let (yes, no) = calc.evaluate(&tally(&addrs[..3], &[false, false, false]));
        assert!(!yes && no);
    }

    #[test]
    fn test_split_votes_reach_nothing() {
        let addrs = addresses(4);
        let calc = QuorumCalculator::new(4);

        let (yes, no) = calc.evaluate(&tally(&addrs, &[true, true, false, false]));
        assert!(!yes && !no);
    }

    #[test]
    fn test_empty_tally() {
        let calc = QuorumCalculator::new(4);
        let (yes, no) = calc.evaluate(&HashMap::new());
        assert!(!yes && !no);
    }
}

//! Counting over participant sets.
//!
//! Majority, quota and voting-rule delegations all reduce to a tally of
//! known `0`s and `1`s plus the number still pending.

use serde::{Deserialize, Serialize};
use unravel_ballot::{AgentId, Bit, Fraction};

use crate::outcome::{OutcomeVector, Snapshot};

/// Counts of known and pending outcomes over a participant list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Participants known to vote `1`.
    pub ones: usize,
    /// Participants known to vote `0`.
    pub zeros: usize,
    /// Participants still unresolved.
    pub pending: usize,
}

impl Tally {
    /// Tallies `participants` (with multiplicity) against `snapshot`.
    pub fn count(participants: &[AgentId], snapshot: &Snapshot) -> Self {
        participants
            .iter()
            .fold(Self::default(), |t, a| t.with(snapshot.get(*a)))
    }

    /// Tallies every agent of a finished or partial run.
    pub fn of_outcome(outcome: &OutcomeVector) -> Self {
        outcome
            .as_slice()
            .iter()
            .fold(Self::default(), |t, o| t.with(*o))
    }

    fn with(mut self, outcome: Option<Bit>) -> Self {
        match outcome {
            Some(Bit::One) => self.ones += 1,
            Some(Bit::Zero) => self.zeros += 1,
            None => self.pending += 1,
        }
        self
    }

    /// Total participants counted.
    pub fn total(&self) -> usize {
        self.ones + self.zeros + self.pending
    }

    /// Count of `bit`.
    pub fn of(&self, bit: Bit) -> usize {
        match bit {
            Bit::One => self.ones,
            Bit::Zero => self.zeros,
        }
    }

    /// The bit held by strictly more than half of all participants.
    ///
    /// Pending participants count towards the total but never match.
    pub fn strict_majority(&self) -> Option<Bit> {
        let total = self.total();
        [Bit::One, Bit::Zero]
            .into_iter()
            .find(|b| 2 * self.of(*b) > total)
    }

    /// Quota outcome: `1` once `threshold` ones are known, `0` once the
    /// known zeros make the threshold unreachable.
    pub fn quota(&self, threshold: usize) -> Option<Bit> {
        if self.ones >= threshold {
            Some(Bit::One)
        } else if self.zeros > self.total().saturating_sub(threshold) {
            Some(Bit::Zero)
        } else {
            None
        }
    }

    /// Voting-rule outcome: a quota whose threshold is `ceil(fraction * total)`.
    pub fn share(&self, fraction: Fraction) -> Option<Bit> {
        self.quota(fraction.threshold_of(self.total()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(ones: usize, zeros: usize, pending: usize) -> Tally {
        Tally {
            ones,
            zeros,
            pending,
        }
    }

    #[test]
    fn test_count_against_snapshot() {
        let y = Snapshot::from_outcomes(vec![Some(Bit::One), None, Some(Bit::Zero)]);
        let ids: Vec<AgentId> = (0..3).map(AgentId::new).collect();
        assert_eq!(Tally::count(&ids, &y), tally(1, 1, 1));

        let repeated = vec![AgentId::new(0), AgentId::new(0), AgentId::new(1)];
        assert_eq!(Tally::count(&repeated, &y), tally(2, 0, 1));
    }

    #[test]
    fn test_strict_majority() {
        assert_eq!(tally(2, 0, 1).strict_majority(), Some(Bit::One));
        assert_eq!(tally(1, 1, 1).strict_majority(), None);
        assert_eq!(tally(1, 1, 0).strict_majority(), None);
        assert_eq!(tally(0, 2, 2).strict_majority(), None);
        assert_eq!(tally(0, 3, 2).strict_majority(), Some(Bit::Zero));
        assert_eq!(tally(0, 0, 3).strict_majority(), None);
    }

    #[test]
    fn test_quota() {
        assert_eq!(tally(2, 0, 1).quota(2), Some(Bit::One));
        assert_eq!(tally(0, 2, 1).quota(2), Some(Bit::Zero));
        assert_eq!(tally(1, 0, 2).quota(2), None);
        assert_eq!(tally(1, 1, 1).quota(2), None);
        assert_eq!(tally(0, 1, 2).quota(3), Some(Bit::Zero));
    }

    #[test]
    fn test_share() {
        let two_thirds = Fraction::new(2, 3).unwrap();
        assert_eq!(tally(2, 0, 1).share(two_thirds), Some(Bit::One));
        assert_eq!(tally(1, 1, 1).share(two_thirds), None);
        assert_eq!(tally(0, 2, 1).share(two_thirds), Some(Bit::Zero));

        let third = Fraction::new(1, 3).unwrap();
        assert_eq!(tally(2, 1, 0).share(third), Some(Bit::One));
        assert_eq!(tally(1, 1, 1).share(third), Some(Bit::One));
        assert_eq!(tally(0, 1, 2).share(third), None);
        assert_eq!(tally(0, 3, 0).share(third), Some(Bit::Zero));
    }

    #[test]
    fn test_share_matches_quota() {
        // rule(1) needs every participant: one known zero settles it.
        assert_eq!(tally(2, 1, 0).share(Fraction::ONE), Some(Bit::Zero));
        assert_eq!(tally(2, 1, 0).quota(3), Some(Bit::Zero));

        // rule(3/4) over four: two zeros leave at most two ones.
        let three_quarters = Fraction::new(3, 4).unwrap();
        assert_eq!(tally(0, 2, 2).share(three_quarters), Some(Bit::Zero));
        assert_eq!(tally(0, 1, 3).share(three_quarters), None);

        for (ones, zeros, pending) in [(0, 0, 5), (1, 2, 2), (3, 1, 1), (2, 3, 0), (4, 0, 1)] {
            let t = tally(ones, zeros, pending);
            for (n, d) in [(1, 5), (2, 5), (1, 2), (3, 5), (4, 5), (1, 1)] {
                let f = Fraction::new(n, d).unwrap();
                assert_eq!(t.share(f), t.quota(f.threshold_of(5)), "{t:?} at {f}");
            }
        }
    }

    #[test]
    fn test_of_outcome() {
        let mut x = OutcomeVector::new(3);
        x.commit(AgentId::new(0), Bit::One);
        x.commit(AgentId::new(2), Bit::One);
        assert_eq!(Tally::of_outcome(&x), tally(2, 0, 1));
    }
}

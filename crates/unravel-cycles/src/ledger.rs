//! Run-wide set of distinct cycles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cycle::Cycle;

/// Deduplicated cycles observed over one policy run.
///
/// Two observations are the same cycle iff their canonical forms match,
/// regardless of the round or level they were seen at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleLedger {
    cycles: BTreeSet<Cycle>,
}

impl CycleLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `cycles`, returning how many were not seen before.
    pub fn record<I>(&mut self, cycles: I) -> usize
    where
        I: IntoIterator<Item = Cycle>,
    {
        cycles.into_iter().filter(|c| self.cycles.insert(c.clone())).count()
    }

    /// Number of distinct cycles.
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// Returns true if no cycle was recorded.
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Returns true if `cycle` was recorded.
    pub fn contains(&self, cycle: &Cycle) -> bool {
        self.cycles.contains(cycle)
    }

    /// Distinct cycles in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter()
    }

    /// Consumes the ledger into a sorted list.
    pub fn into_vec(self) -> Vec<Cycle> {
        self.cycles.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unravel_ballot::AgentId;

    fn cycle(agents: &[usize]) -> Cycle {
        Cycle::new(agents.iter().map(|i| AgentId::new(*i)).collect())
    }

    #[test]
    fn test_record_deduplicates_rotations() {
        let mut ledger = CycleLedger::new();
        assert_eq!(ledger.record(vec![cycle(&[0, 1])]), 1);
        assert_eq!(ledger.record(vec![cycle(&[1, 0]), cycle(&[2])]), 1);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&cycle(&[1, 0])));
    }

    #[test]
    fn test_orientation_matters() {
        let mut ledger = CycleLedger::new();
        ledger.record(vec![cycle(&[0, 1, 2]), cycle(&[0, 2, 1])]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_into_vec_sorted() {
        let mut ledger = CycleLedger::new();
        ledger.record(vec![cycle(&[3, 4]), cycle(&[1, 2])]);
        let cycles = ledger.into_vec();
        assert_eq!(cycles[0], cycle(&[1, 2]));
        assert_eq!(cycles[1], cycle(&[3, 4]));
    }

    #[test]
    fn test_ledger_serialization() {
        let mut ledger = CycleLedger::new();
        ledger.record(vec![cycle(&[0, 1])]);
        let json = serde_json::to_string(&ledger).unwrap();
        let parsed: CycleLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ledger);
    }
}

//! Outcome vector and round snapshots.

use serde::{Deserialize, Serialize};
use unravel_ballot::{AgentId, Bit};

/// Per-agent outcome of one policy run: unresolved (`None`) or a bit.
///
/// Monotonic: [`OutcomeVector::commit`] never overwrites a resolved agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeVector {
    slots: Vec<Option<Bit>>,
}

impl OutcomeVector {
    /// All-unresolved vector for `agents` agents.
    pub fn new(agents: usize) -> Self {
        Self {
            slots: vec![None; agents],
        }
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true for a vector over zero agents.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Outcome of `agent`, if resolved.
    pub fn get(&self, agent: AgentId) -> Option<Bit> {
        self.slots.get(agent.index()).copied().flatten()
    }

    /// Returns true if `agent` has an outcome.
    pub fn is_resolved(&self, agent: AgentId) -> bool {
        self.get(agent).is_some()
    }

    /// Records `bit` for an unresolved agent.
    ///
    /// Returns false, leaving the vector untouched, if the agent was
    /// already resolved or is out of range.
    pub fn commit(&mut self, agent: AgentId, bit: Bit) -> bool {
        match self.slots.get_mut(agent.index()) {
            Some(slot) if slot.is_none() => {
                *slot = Some(bit);
                true
            }
            _ => false,
        }
    }

    /// Unresolved agents in roster order.
    pub fn unresolved(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| AgentId::new(i))
    }

    /// Number of resolved agents.
    pub fn resolved_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns true once every agent is resolved.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Freezes the current state for a round.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            slots: self.slots.clone(),
        }
    }

    /// Returns true if nothing changed since `snapshot` was taken.
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.slots == snapshot.slots
    }

    /// Raw per-agent outcomes in roster order.
    pub fn as_slice(&self) -> &[Option<Bit>] {
        &self.slots
    }
}

/// Immutable copy of an [`OutcomeVector`] taken at the start of a round.
///
/// All resolvability decisions inside a round read from the snapshot,
/// never from the vector being updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    slots: Vec<Option<Bit>>,
}

impl Snapshot {
    /// Builds a snapshot directly from per-agent outcomes.
    pub fn from_outcomes(slots: Vec<Option<Bit>>) -> Self {
        Self { slots }
    }

    /// Outcome of `agent` at snapshot time.
    pub fn get(&self, agent: AgentId) -> Option<Bit> {
        self.slots.get(agent.index()).copied().flatten()
    }

    /// Returns true if `agent` was unresolved at snapshot time.
    pub fn is_unresolved(&self, agent: AgentId) -> bool {
        self.get(agent).is_none()
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true for a snapshot over zero agents.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

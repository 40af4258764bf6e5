//! Run reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use unravel_ballot::{AgentId, Bit, Roster};
use unravel_cycles::Cycle;
use unravel_logic::{OutcomeVector, Tally};

use crate::policy::{Commit, Policy};

/// Reports of several policy runs keyed by policy.
pub type PolicyReports = BTreeMap<Policy, RunReport>;

/// Result of one policy run over a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Policy that produced this run.
    pub policy: Policy,
    /// Agent names in roster order.
    pub agents: Vec<String>,
    /// Final outcome vector; every agent is resolved.
    pub outcome: OutcomeVector,
    /// Number of distinct cycles observed.
    pub cycle_count: usize,
    /// The distinct cycles, canonical and sorted.
    pub cycles: Vec<Cycle>,
    /// Rounds until every agent was resolved.
    pub rounds: usize,
    /// (round, level) steps taken across all rounds.
    pub steps: usize,
    /// Commits in order, if tracing was enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEntry>,
    /// Collective decision derived from the outcome.
    pub collective: CollectiveOutcome,
}

impl RunReport {
    /// Outcome of the agent called `name`.
    pub fn outcome_of(&self, name: &str) -> Option<Bit> {
        let index = self.agents.iter().position(|a| a == name)?;
        self.outcome.get(AgentId::new(index))
    }

    /// The `(OutcomeVector, cycle_count)` pair of the engine contract.
    pub fn into_parts(self) -> (OutcomeVector, usize) {
        (self.outcome, self.cycle_count)
    }

    /// One-line summary, e.g. `U   A=0 B=0 C=0 | rounds 3 | cycles 0 | decision 0 (0-3)`.
    pub fn summary(&self) -> String {
        let mut out = format!("{:<4}", self.policy.code());
        for (i, name) in self.agents.iter().enumerate() {
            let value = self
                .outcome
                .get(AgentId::new(i))
                .map_or_else(|| "?".to_string(), |b| b.to_string());
            let _ = write!(out, "{}={} ", name, value);
        }
        let _ = write!(
            out,
            "| rounds {} | cycles {} | decision {}",
            self.rounds, self.cycle_count, self.collective
        );
        out
    }

    /// Cycles rendered with agent names.
    pub fn render_cycles(&self) -> Vec<String> {
        let roster = Roster::from_names(self.agents.iter().cloned())
            .unwrap_or_else(|_| Roster::with_default_names(self.agents.len()));
        self.cycles.iter().map(|c| c.render(&roster)).collect()
    }
}

/// One commit together with the round it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Round number, starting at 1.
    pub round: usize,
    /// The commit itself.
    #[serde(flatten)]
    pub commit: Commit,
}

/// Collective decision over the final outcome vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectiveOutcome {
    /// Agents whose outcome is `1`.
    pub ones: usize,
    /// Agents whose outcome is `0`.
    pub zeros: usize,
    /// Strict-majority bit, or `None` on a tie.
    pub decision: Option<Bit>,
}

impl CollectiveOutcome {
    /// Derives the collective decision from `outcome`.
    pub fn from_outcome(outcome: &OutcomeVector) -> Self {
        let tally = Tally::of_outcome(outcome);
        Self {
            ones: tally.ones,
            zeros: tally.zeros,
            decision: tally.strict_majority(),
        }
    }
}

impl std::fmt::Display for CollectiveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.decision {
            Some(bit) => write!(f, "{} ({}-{})", bit, self.ones, self.zeros),
            None => write!(f, "tie ({}-{})", self.ones, self.zeros),
        }
    }
}

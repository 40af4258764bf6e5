//! Resolution policies.
//!
//! All four policies share the resolvability oracle of
//! [`unravel_logic::Resolvable`]; they differ only in which resolvable
//! agents they commit during one (round, level) step.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unravel_ballot::{AgentId, Bit, Profile};
use unravel_logic::{OutcomeVector, Resolvable, Snapshot};

/// Commit rule applied at every step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// `U`: every resolvable agent commits at once.
    #[serde(rename = "U")]
    Unconditional,
    /// `DU`: direct votes first; computed delegations only if none.
    #[serde(rename = "DU")]
    DirectPriority,
    /// `RU`: one uniformly random resolvable agent.
    #[serde(rename = "RU")]
    Randomized,
    /// `DRU`: one random direct voter, else one random resolvable agent.
    #[serde(rename = "DRU")]
    DirectRandomized,
}

impl Policy {
    /// Every policy, in reporting order.
    pub const ALL: [Policy; 4] = [
        Policy::Unconditional,
        Policy::DirectPriority,
        Policy::Randomized,
        Policy::DirectRandomized,
    ];

    /// Short code: `U`, `DU`, `RU` or `DRU`.
    pub fn code(self) -> &'static str {
        match self {
            Policy::Unconditional => "U",
            Policy::DirectPriority => "DU",
            Policy::Randomized => "RU",
            Policy::DirectRandomized => "DRU",
        }
    }

    /// One-line description for listings.
    pub fn description(self) -> &'static str {
        match self {
            Policy::Unconditional => "commit every resolvable agent",
            Policy::DirectPriority => "direct votes preempt computed delegations",
            Policy::Randomized => "commit one random resolvable agent",
            Policy::DirectRandomized => "commit one random direct voter, else one random resolvable agent",
        }
    }

    /// Returns true if the policy draws from the random source.
    pub fn is_randomized(self) -> bool {
        matches!(self, Policy::Randomized | Policy::DirectRandomized)
    }

    /// Returns true if direct votes preempt computed delegations.
    pub fn has_direct_priority(self) -> bool {
        matches!(self, Policy::DirectPriority | Policy::DirectRandomized)
    }

    /// Applies one step at `level`, committing into `outcome`.
    ///
    /// Resolvability is read from `snapshot` only. Returns the commits in
    /// the order they were made.
    pub fn step<R: Rng + ?Sized>(
        self,
        profile: &Profile,
        snapshot: &Snapshot,
        level: usize,
        outcome: &mut OutcomeVector,
        rng: &mut R,
    ) -> Vec<Commit> {
        let candidates: Vec<Commit> = outcome
            .unresolved()
            .filter_map(|agent| {
                let expr = profile.cell(agent, level);
                let bit = expr.resolve(snapshot).bit()?;
                let kind = if expr.direct_vote().is_some() {
                    CommitKind::Direct
                } else {
                    CommitKind::Delegated
                };
                Some(Commit {
                    agent,
                    level,
                    bit,
                    kind,
                })
            })
            .collect();

        let chosen: Vec<Commit> = match self {
            Policy::Unconditional => candidates,
            Policy::DirectPriority => {
                let direct: Vec<Commit> =
                    candidates.iter().copied().filter(Commit::is_direct).collect();
                if direct.is_empty() {
                    candidates
                } else {
                    direct
                }
            }
            Policy::Randomized => candidates.choose(rng).copied().into_iter().collect(),
            Policy::DirectRandomized => {
                let (direct, computed): (Vec<Commit>, Vec<Commit>) =
                    candidates.into_iter().partition(Commit::is_direct);
                let pool = if direct.is_empty() { computed } else { direct };
                pool.choose(rng).copied().into_iter().collect()
            }
        };

        for commit in &chosen {
            outcome.commit(commit.agent, commit.bit);
        }
        chosen
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u" | "unconditional" => Ok(Policy::Unconditional),
            "du" | "direct-priority" => Ok(Policy::DirectPriority),
            "ru" | "randomized" => Ok(Policy::Randomized),
            "dru" | "direct-randomized" => Ok(Policy::DirectRandomized),
            other => Err(format!(
                "unknown policy '{}': expected one of U, DU, RU, DRU",
                other
            )),
        }
    }
}

/// How a committed bit was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
    /// The agent's own direct vote at that level.
    Direct,
    /// Computed from other agents' outcomes.
    Delegated,
}

/// One agent resolved by a policy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commit {
    /// The resolved agent.
    pub agent: AgentId,
    /// Level whose expression produced the bit.
    pub level: usize,
    /// Committed bit.
    pub bit: Bit,
    /// Direct vote or computed delegation.
    pub kind: CommitKind,
}

impl Commit {
    /// Returns true for a direct-vote commit.
    pub fn is_direct(&self) -> bool {
        self.kind == CommitKind::Direct
    }
}

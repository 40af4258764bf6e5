//! The immutable (agent, level) → expression table.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::agent::{AgentId, Roster};
use crate::error::{BallotError, CellError, Result};
use crate::expression::DelegationExpression;

static BLANK: DelegationExpression = DelegationExpression::Blank;

/// A smart ballot profile.
///
/// Rows follow roster order; each row holds one expression per preference
/// level, `1..=max_level`. A validated profile guarantees that every agent
/// has exactly one terminal direct vote, preceded only by delegations and
/// followed only by blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    roster: Roster,
    rows: Vec<Vec<DelegationExpression>>,
    max_level: usize,
}

impl Profile {
    /// Builds and validates a profile whose depth is the longest row.
    ///
    /// # Errors
    ///
    /// Any [`BallotError`] describing a violation of the ballot contract.
    pub fn new(roster: Roster, rows: Vec<Vec<DelegationExpression>>) -> Result<Self> {
        let depth = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self::with_depth(roster, rows, depth)
    }

    /// Builds and validates a profile with an explicit depth.
    ///
    /// Rows shorter than `max_level` are padded with blanks.
    pub fn with_depth(
        roster: Roster,
        rows: Vec<Vec<DelegationExpression>>,
        max_level: usize,
    ) -> Result<Self> {
        let profile = Self::new_unvalidated(roster, rows, max_level)?;
        profile.check_termination()?;
        debug!(
            agents = profile.agent_count(),
            max_level = profile.max_level,
            "profile validated"
        );
        Ok(profile)
    }

    /// Builds a profile checking shape, references and expression structure,
    /// but not the terminal-vote guarantee.
    ///
    /// Agents without a direct vote can then leave the scheduler with no
    /// resolvable agent, which it reports as a stuck state.
    pub fn new_unvalidated(
        roster: Roster,
        mut rows: Vec<Vec<DelegationExpression>>,
        max_level: usize,
    ) -> Result<Self> {
        if roster.is_empty() || max_level == 0 {
            return Err(BallotError::Empty);
        }
        if rows.len() != roster.len() {
            return Err(BallotError::RowCountMismatch {
                rows: rows.len(),
                agents: roster.len(),
            });
        }

        for (agent, row) in roster.ids().zip(rows.iter_mut()) {
            if row.len() > max_level {
                return Err(BallotError::InconsistentDepth {
                    agent: roster.name(agent).to_string(),
                    found: row.len(),
                    max_level,
                });
            }
            row.resize(max_level, DelegationExpression::Blank);

            for (i, expr) in row.iter().enumerate() {
                let invalid = |source| BallotError::InvalidExpression {
                    agent: roster.name(agent).to_string(),
                    level: i + 1,
                    source,
                };
                expr.validate().map_err(invalid)?;
                if let Some(stray) = expr.references().into_iter().find(|r| !roster.contains(*r)) {
                    return Err(invalid(CellError::UnknownAgent(stray.to_string())));
                }
            }
        }

        Ok(Self {
            roster,
            rows,
            max_level,
        })
    }

    fn check_termination(&self) -> Result<()> {
        for (agent, row) in self.roster.ids().zip(&self.rows) {
            let name = || self.roster.name(agent).to_string();
            let terminal = row
                .iter()
                .position(|e| e.direct_vote().is_some())
                .ok_or_else(|| BallotError::MissingTerminalVote {
                    agent: name(),
                    max_level: self.max_level,
                })?;

            if let Some(i) = row[..terminal].iter().position(DelegationExpression::is_blank) {
                return Err(BallotError::BlankBeforeTerminal {
                    agent: name(),
                    level: i + 1,
                });
            }
            if let Some(i) = row[terminal + 1..].iter().position(|e| !e.is_blank()) {
                return Err(BallotError::CellAfterTerminal {
                    agent: name(),
                    level: terminal + i + 2,
                });
            }
        }
        Ok(())
    }

    /// The ordered agent list.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Number of agents.
    pub fn agent_count(&self) -> usize {
        self.roster.len()
    }

    /// The profile's maximal depth `L`.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Expression of `agent` at the 1-based `level`.
    ///
    /// Levels outside `1..=max_level` and unknown agents read as blank.
    pub fn cell(&self, agent: AgentId, level: usize) -> &DelegationExpression {
        level
            .checked_sub(1)
            .and_then(|i| self.rows.get(agent.index())?.get(i))
            .unwrap_or(&BLANK)
    }

    /// All expressions of `agent`, level 1 first.
    pub fn row(&self, agent: AgentId) -> &[DelegationExpression] {
        self.rows.get(agent.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Level of the agent's direct vote, if it has one.
    pub fn terminal_level(&self, agent: AgentId) -> Option<usize> {
        self.row(agent)
            .iter()
            .position(|e| e.direct_vote().is_some())
            .map(|i| i + 1)
    }

    /// Non-blank cells per expression kind (see [`DelegationExpression::kind`]).
    pub fn form_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for expr in self.rows.iter().flatten().filter(|e| !e.is_blank()) {
            *counts.entry(expr.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Renders the profile as ballot text, one line per agent.
    ///
    /// Trailing blanks are omitted; agent names are written only when the
    /// roster does not use default names.
    pub fn to_ballot_text(&self) -> String {
        let named = !self.roster.has_default_names();
        let mut out = String::new();
        for (agent, row) in self.roster.ids().zip(&self.rows) {
            if named {
                out.push_str(self.roster.name(agent));
                out.push_str(": ");
            }
            let used = row.iter().rposition(|e| !e.is_blank()).map_or(0, |i| i + 1);
            let cells: Vec<String> = row[..used]
                .iter()
                .map(|e| e.display(&self.roster).to_string())
                .collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    /// SHA-256 hex digest of the canonical ballot text and depth.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.max_level.to_le_bytes());
        hasher.update(self.to_ballot_text().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

//! Agent identifiers and the ordered roster.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BallotError, Result};

/// Opaque agent identifier.
///
/// The wrapped value is the agent's position on the [`Roster`], which is
/// also the total order used to canonicalize cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(usize);

impl AgentId {
    /// Creates an identifier for the agent at `index` on the roster.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the roster position.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Spreadsheet-style default name for the agent at `index`.
///
/// `0 -> A`, `25 -> Z`, `26 -> AA`, `27 -> AB`, ...
///
/// ```rust
/// use unravel_ballot::default_name;
///
/// assert_eq!(default_name(0), "A");
/// assert_eq!(default_name(26), "AA");
/// ```
pub fn default_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The ordered list of agents taking part in a ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
    by_name: HashMap<String, AgentId>,
}

impl Roster {
    /// Builds a roster of `count` agents named `A, B, ..., Z, AA, ...`.
    pub fn with_default_names(count: usize) -> Self {
        let names: Vec<String> = (0..count).map(default_name).collect();
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), AgentId::new(i)))
            .collect();
        Self { names, by_name }
    }

    /// Builds a roster from explicit names.
    ///
    /// # Errors
    ///
    /// Returns [`BallotError::InvalidRoster`] if a name is not an
    /// identifier (`[A-Za-z][A-Za-z0-9_]*`) or appears twice.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut by_name = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if !is_valid_name(name) {
                return Err(BallotError::InvalidRoster(format!(
                    "'{name}' is not a valid agent name"
                )));
            }
            if by_name.insert(name.clone(), AgentId::new(i)).is_some() {
                return Err(BallotError::InvalidRoster(format!(
                    "agent '{name}' listed twice"
                )));
            }
        }
        Ok(Self { names, by_name })
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the roster has no agents.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Looks up an agent by name.
    pub fn lookup(&self, name: &str) -> Option<AgentId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of `agent`, or `"?"` for an identifier from another roster.
    pub fn name(&self, agent: AgentId) -> &str {
        self.names.get(agent.index()).map(String::as_str).unwrap_or("?")
    }

    /// Returns true if `agent` belongs to this roster.
    pub fn contains(&self, agent: AgentId) -> bool {
        agent.index() < self.names.len()
    }

    /// Iterates agent identifiers in roster order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.names.len()).map(AgentId::new)
    }

    /// Iterates `(id, name)` pairs in roster order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (AgentId::new(i), n.as_str()))
    }

    /// Returns the names in roster order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns true if every agent carries its default spreadsheet name.
    pub fn has_default_names(&self) -> bool {
        self.names
            .iter()
            .enumerate()
            .all(|(i, n)| *n == default_name(i))
    }
}

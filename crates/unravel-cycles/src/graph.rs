//! Per-level delegation dependency graph.

use unravel_ballot::{AgentId, Profile};
use unravel_logic::Snapshot;

/// Directed graph over agents: `u -> v` when `u` waits on `v`.
///
/// Successor lists are sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    adjacency: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds the still-unresolved dependency graph at `level`.
    ///
    /// An edge `u -> v` exists iff both `u` and `v` are unresolved in
    /// `snapshot` and `u`'s expression at `level` references `v`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use unravel_ballot::parse_ballot;
    /// use unravel_cycles::DependencyGraph;
    /// use unravel_logic::OutcomeVector;
    ///
    /// let profile = parse_ballot("B,0\nA,1\n")?;
    /// let y = OutcomeVector::new(2).snapshot();
    /// let graph = DependencyGraph::build(&profile, &y, 1);
    /// assert_eq!(graph.edge_count(), 2);
    /// # Ok::<(), unravel_ballot::BallotError>(())
    /// ```
    pub fn build(profile: &Profile, snapshot: &Snapshot, level: usize) -> Self {
        let adjacency = profile
            .roster()
            .ids()
            .map(|u| {
                if !snapshot.is_unresolved(u) {
                    return Vec::new();
                }
                profile
                    .cell(u, level)
                    .references()
                    .into_iter()
                    .filter(|v| snapshot.is_unresolved(*v))
                    .map(AgentId::index)
                    .collect()
            })
            .collect();
        Self { adjacency }
    }

    /// Builds a graph over `nodes` agents from explicit edges.
    ///
    /// Edges touching agents outside `0..nodes` are ignored.
    pub fn from_edges<I>(nodes: usize, edges: I) -> Self
    where
        I: IntoIterator<Item = (AgentId, AgentId)>,
    {
        let mut adjacency = vec![Vec::new(); nodes];
        for (u, v) in edges {
            if u.index() < nodes && v.index() < nodes {
                adjacency[u.index()].push(v.index());
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        Self { adjacency }
    }

    /// Number of agents in the graph.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Agents `agent` waits on, ascending.
    pub fn successors(&self, agent: AgentId) -> impl Iterator<Item = AgentId> + '_ {
        self.neighbours(agent.index()).iter().map(|v| AgentId::new(*v))
    }

    /// Returns true if `from -> to` is an edge.
    pub fn has_edge(&self, from: AgentId, to: AgentId) -> bool {
        self.neighbours(from.index()).binary_search(&to.index()).is_ok()
    }

    pub(crate) fn neighbours(&self, node: usize) -> &[usize] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}

//! Elementary circuit enumeration over dependency graphs.
//!
//! Tarjan's SCC algorithm isolates the strongly connected component
//! around each start node; Johnson's algorithm then enumerates every
//! elementary circuit through it exactly once.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use unravel_ballot::{AgentId, Roster};

use crate::graph::DependencyGraph;

/// One elementary circuit in canonical form.
///
/// The agent list starts at its smallest agent and follows the edges;
/// the closing edge back to the first agent is implicit.
///
/// # Example
///
/// ```rust
/// use unravel_ballot::AgentId;
/// use unravel_cycles::Cycle;
///
/// let ba = Cycle::new(vec![AgentId::new(1), AgentId::new(0)]);
/// let ab = Cycle::new(vec![AgentId::new(0), AgentId::new(1)]);
/// assert_eq!(ab, ba);
/// assert_eq!(ab.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cycle {
    agents: Vec<AgentId>,
}

impl Cycle {
    /// Creates a cycle from agents in traversal order, canonicalizing it.
    pub fn new(agents: Vec<AgentId>) -> Self {
        Self {
            agents: canonicalize(&agents),
        }
    }

    /// Agents in canonical order.
    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    /// Number of distinct agents on the circuit.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true for the empty cycle.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Returns true for a single agent waiting on itself.
    pub fn is_self_loop(&self) -> bool {
        self.agents.len() == 1
    }

    /// Renders the circuit with roster names, e.g. `A -> B -> A`.
    pub fn render(&self, roster: &Roster) -> String {
        let mut out = String::new();
        for agent in &self.agents {
            let _ = write!(out, "{} -> ", roster.name(*agent));
        }
        if let Some(first) = self.agents.first() {
            out.push_str(roster.name(*first));
        }
        out
    }
}

/// Rotates `agents` so the smallest agent comes first.
///
/// Traversal order is preserved; only the starting point moves.
pub fn canonicalize(agents: &[AgentId]) -> Vec<AgentId> {
    let start = agents
        .iter()
        .enumerate()
        .min_by_key(|(_, a)| **a)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated = agents.to_vec();
    rotated.rotate_left(start);
    rotated
}

/// Strongly connected components of `graph`, each sorted ascending.
///
/// Components are listed in the order Tarjan's algorithm completes them
/// (reverse topological order of the condensation).
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
pub fn strongly_connected_components(graph: &DependencyGraph) -> Vec<Vec<AgentId>> {
    let mut tarjan = Tarjan::new(graph, 0);
    for node in 0..graph.node_count() {
        if tarjan.index[node].is_none() {
            tarjan.visit(node);
        }
    }
    tarjan
        .components
        .into_iter()
        .map(|mut c| {
            c.sort_unstable();
            c.into_iter().map(AgentId::new).collect()
        })
        .collect()
}

/// Enumerates every elementary circuit of `graph`, canonicalized.
///
/// Self-loops count as circuits of length one. Circuits are returned in
/// order of their smallest agent, then discovery order.
///
/// # Algorithm
///
/// For each start node `s` in ascending order:
///
/// 1. Restrict the graph to nodes `>= s`
/// 2. Find the strongly connected component containing `s`
/// 3. Walk circuits from `s` inside it, blocking nodes that cannot
///    currently reach `s` and unblocking them once they can
///
/// # Complexity
///
/// - Time: O((V + E)(C + 1)) for C circuits
/// - Space: O(V + E)
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut cycles = Vec::new();
    for start in 0..graph.node_count() {
        let component = component_of(graph, start);
        if component.len() == 1 && !graph.neighbours(start).contains(&start) {
            continue;
        }
        let mut johnson = Johnson::new(graph, start, &component);
        johnson.circuit(start);
        cycles.extend(johnson.found);
    }
    cycles
}

/// Component containing `start` within the subgraph of nodes `>= start`.
fn component_of(graph: &DependencyGraph, start: usize) -> Vec<usize> {
    let mut tarjan = Tarjan::new(graph, start);
    tarjan.visit(start);
    // `start` is the DFS root, so its component completes last.
    tarjan.components.pop().unwrap_or_default()
}

struct Tarjan<'g> {
    graph: &'g DependencyGraph,
    min_node: usize,
    counter: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g DependencyGraph, min_node: usize) -> Self {
        let n = graph.node_count();
        Self {
            graph,
            min_node,
            counter: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.counter);
        self.lowlink[node] = self.counter;
        self.counter += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let graph = self.graph;
        for &next in graph.neighbours(node) {
            if next < self.min_node {
                continue;
            }
            match self.index[next] {
                None => {
                    self.visit(next);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(idx) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(idx);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[node]) == self.index[node] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

struct Johnson<'g> {
    graph: &'g DependencyGraph,
    start: usize,
    allowed: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<Vec<usize>>,
    path: Vec<usize>,
    found: Vec<Cycle>,
}

impl<'g> Johnson<'g> {
    fn new(graph: &'g DependencyGraph, start: usize, component: &[usize]) -> Self {
        let n = graph.node_count();
        let mut allowed = vec![false; n];
        for &node in component {
            allowed[node] = true;
        }
        Self {
            graph,
            start,
            allowed,
            blocked: vec![false; n],
            blocked_by: vec![Vec::new(); n],
            path: Vec::new(),
            found: Vec::new(),
        }
    }

    fn circuit(&mut self, node: usize) -> bool {
        let mut closed = false;
        self.path.push(node);
        self.blocked[node] = true;

        let graph = self.graph;
        for &next in graph.neighbours(node) {
            if !self.allowed[next] {
                continue;
            }
            if next == self.start {
                self.found.push(Cycle::new(
                    self.path.iter().map(|i| AgentId::new(*i)).collect(),
                ));
                closed = true;
            } else if !self.blocked[next] && self.circuit(next) {
                closed = true;
            }
        }

        if closed {
            self.unblock(node);
        } else {
            for &next in graph.neighbours(node) {
                if self.allowed[next] && !self.blocked_by[next].contains(&node) {
                    self.blocked_by[next].push(node);
                }
            }
        }

        self.path.pop();
        closed
    }

    fn unblock(&mut self, node: usize) {
        self.blocked[node] = false;
        let waiting = std::mem::take(&mut self.blocked_by[node]);
        for w in waiting {
            if self.blocked[w] {
                self.unblock(w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: usize) -> AgentId {
        AgentId::new(i)
    }

    fn graph(n: usize, edges: &[(usize, usize)]) -> DependencyGraph {
        DependencyGraph::from_edges(n, edges.iter().map(|(u, v)| (id(*u), id(*v))))
    }

    #[test]
    fn test_canonicalize_rotates_to_minimum() {
        assert_eq!(canonicalize(&[id(2), id(0), id(1)]), vec![id(0), id(1), id(2)]);
        assert_eq!(canonicalize(&[id(1), id(0)]), vec![id(0), id(1)]);
        assert_eq!(canonicalize(&[id(3), id(1), id(2)]), vec![id(1), id(2), id(3)]);
        assert!(canonicalize(&[]).is_empty());
    }

    #[test]
    fn test_canonicalize_keeps_direction() {
        // 0 -> 2 -> 1 -> 0 is not the same circuit as 0 -> 1 -> 2 -> 0.
        assert_eq!(canonicalize(&[id(2), id(1), id(0)]), vec![id(0), id(2), id(1)]);
    }

    #[test]
    fn test_two_cycle_found_once() {
        let cycles = find_cycles(&graph(2, &[(0, 1), (1, 0)]));
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].agents(), &[id(0), id(1)]);
        assert_eq!(cycles[0], Cycle::new(vec![id(1), id(0)]));
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let cycles = find_cycles(&graph(4, &[(0, 1), (1, 2), (0, 2), (2, 3)]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_self_loop() {
        let cycles = find_cycles(&graph(2, &[(1, 1), (0, 1)]));
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].is_self_loop());
        assert_eq!(cycles[0].agents(), &[id(1)]);
    }

    #[test]
    fn test_complete_graph_on_three() {
        let edges: Vec<(usize, usize)> = (0..3)
            .flat_map(|u| (0..3).filter(move |v| *v != u).map(move |v| (u, v)))
            .collect();
        let cycles = find_cycles(&graph(3, &edges));
        // Three 2-cycles plus both orientations of the triangle.
        assert_eq!(cycles.len(), 5);
        assert!(cycles.contains(&Cycle::new(vec![id(0), id(1), id(2)])));
        assert!(cycles.contains(&Cycle::new(vec![id(0), id(2), id(1)])));
    }

    #[test]
    fn test_complete_graph_on_four() {
        let edges: Vec<(usize, usize)> = (0..4)
            .flat_map(|u| (0..4).filter(move |v| *v != u).map(move |v| (u, v)))
            .collect();
        // 6 two-cycles + 8 three-cycles + 6 four-cycles.
        assert_eq!(find_cycles(&graph(4, &edges)).len(), 20);
    }

    #[test]
    fn test_cycles_are_distinct() {
        let g = graph(5, &[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2), (1, 0)]);
        let cycles = find_cycles(&g);
        let mut unique = cycles.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), cycles.len());
        assert_eq!(cycles.len(), 3);
    }

    #[test]
    fn test_strongly_connected_components() {
        let g = graph(5, &[(0, 1), (1, 0), (1, 2), (3, 4)]);
        let mut components = strongly_connected_components(&g);
        components.sort();
        assert_eq!(
            components,
            vec![vec![id(0), id(1)], vec![id(2)], vec![id(3)], vec![id(4)]]
        );
    }

    #[test]
    fn test_render() {
        let roster = Roster::with_default_names(3);
        let cycle = Cycle::new(vec![id(2), id(0)]);
        assert_eq!(cycle.render(&roster), "A -> C -> A");
        assert_eq!(Cycle::new(vec![id(1)]).render(&roster), "B -> B");
    }
}

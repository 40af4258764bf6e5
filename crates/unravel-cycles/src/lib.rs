//! # Cycle Analyzer
//!
//! Diagnostic cycle statistics for the unravelling engine.
//!
//! ## Overview
//!
//! At every (round, level) step the scheduler asks which still-unresolved
//! agents wait on each other. The answer never influences resolution; it
//! only feeds the per-run count of distinct delegation cycles.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`DependencyGraph`] | Unresolved-to-unresolved edges at one level |
//! | [`find_cycles`] | Johnson's elementary circuit enumeration |
//! | [`strongly_connected_components`] | Tarjan's SCC decomposition |
//! | [`Cycle`] | Circuit rotated to start at its smallest agent |
//! | [`CycleLedger`] | Distinct cycles across a whole run |
//!
//! ## Example
//!
//! ```rust
//! use unravel_ballot::parse_ballot;
//! use unravel_cycles::level_cycles;
//! use unravel_logic::OutcomeVector;
//!
//! let profile = parse_ballot("B,0\nA,1\n")?;
//! let y = OutcomeVector::new(2).snapshot();
//! let cycles = level_cycles(&profile, &y, 1);
//! assert_eq!(cycles.len(), 1);
//! assert_eq!(cycles[0].render(profile.roster()), "A -> B -> A");
//! # Ok::<(), unravel_ballot::BallotError>(())
//! ```
//!
//! ## References
//!
//! - Tarjan, R. E. (1972). "Depth-first search and linear graph algorithms"
//!   *SIAM Journal on Computing*, 1(2), 146-160.
//! - Johnson, D. B. (1975). "Finding all the elementary circuits of a
//!   directed graph" *SIAM Journal on Computing*, 4(1), 77-84.

mod cycle;
mod graph;
mod ledger;

pub use cycle::{canonicalize, find_cycles, strongly_connected_components, Cycle};
pub use graph::DependencyGraph;
pub use ledger::CycleLedger;

use tracing::trace;
use unravel_ballot::Profile;
use unravel_logic::Snapshot;

/// Canonical cycles of the dependency graph at `level` under `snapshot`.
pub fn level_cycles(profile: &Profile, snapshot: &Snapshot, level: usize) -> Vec<Cycle> {
    let graph = DependencyGraph::build(profile, snapshot, level);
    if graph.edge_count() == 0 {
        return Vec::new();
    }
    let cycles = find_cycles(&graph);
    trace!(
        level,
        edges = graph.edge_count(),
        cycles = cycles.len(),
        "dependency graph analysed"
    );
    cycles
}

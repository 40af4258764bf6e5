//! # Unravelling Engine
//!
//! Resolves a collective binary decision from a smart-ballot profile in
//! which agents vote directly or delegate, possibly conditionally, across
//! ordered preference levels.
//!
//! ## Policies
//!
//! | Code | Policy | Commits per step |
//! |------|--------|------------------|
//! | `U` | [`Policy::Unconditional`] | every resolvable agent |
//! | `DU` | [`Policy::DirectPriority`] | direct voters, else every resolvable agent |
//! | `RU` | [`Policy::Randomized`] | one random resolvable agent |
//! | `DRU` | [`Policy::DirectRandomized`] | one random direct voter, else one random resolvable agent |
//!
//! ## Architecture
//!
//! ```text
//!   ballot text ──► unravel-ballot ──► Profile (immutable, shared)
//!                                          │
//!                      ┌───────────────────┼───────────────────┐
//!                      ▼                   ▼                   ▼
//!                 Scheduler U   ...   Scheduler RU   ...  Scheduler DRU
//!                      │   owns OutcomeVector + CycleLedger + rng
//!                      ├──► unravel-logic   (resolvability oracle)
//!                      └──► unravel-cycles  (diagnostic cycle counts)
//!                                          │
//!                                          ▼
//!                                  PolicyReports
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use unravel_ballot::parse_ballot;
//! use unravel_core::{run, run_all_policies, Policy};
//!
//! let profile = parse_ballot("B,0\nA,1\n")?;
//! let mut rng = StdRng::seed_from_u64(3);
//!
//! let (outcome, cycles) = run(&profile, Policy::DirectPriority, &mut rng)?.into_parts();
//! assert!(outcome.is_complete());
//! assert_eq!(cycles, 1);
//!
//! let reports = run_all_policies(&profile, &mut rng)?;
//! assert_eq!(reports.len(), 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod engine;
mod error;
mod policy;
mod report;
mod scheduler;

pub use config::{EngineConfig, UnravelConfig};
pub use engine::Engine;
pub use error::EngineError;
pub use policy::{Commit, CommitKind, Policy};
pub use report::{CollectiveOutcome, PolicyReports, RunReport, TraceEntry};
pub use scheduler::Scheduler;

// Re-export component types for convenience
pub use unravel_ballot::{Bit, Profile};
pub use unravel_cycles::Cycle;
pub use unravel_logic::OutcomeVector;

use rand::Rng;

/// Core result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Runs `policy` over `profile` with default options.
pub fn run<R: Rng + ?Sized>(profile: &Profile, policy: Policy, rng: &mut R) -> Result<RunReport> {
    Scheduler::new(profile, policy).run(rng)
}

/// Runs all four policies over `profile` with default options.
///
/// Per-policy generators are seeded from `rng`; see [`Engine::run_all`].
pub fn run_all_policies<R: Rng + ?Sized>(profile: &Profile, rng: &mut R) -> Result<PolicyReports> {
    Engine::new(EngineConfig::default())?.run_all(profile, rng)
}

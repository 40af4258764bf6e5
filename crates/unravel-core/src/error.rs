//! Error types for the unravelling engine.

use thiserror::Error;
use unravel_ballot::BallotError;

use crate::policy::Policy;

/// Core error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The profile failed validation or a cell failed to parse.
    #[error("invalid profile: {0}")]
    DataInvalid(#[from] BallotError),

    /// A round exhausted every level without committing anything.
    ///
    /// Only reachable for profiles that break the termination guarantee.
    #[error(
        "{policy} run stuck in round {round}: no progress through level {max_level}, unresolved: {}",
        .unresolved.join(", ")
    )]
    StuckState {
        /// Policy whose run stalled.
        policy: Policy,
        /// Round in which no level made progress.
        round: usize,
        /// The profile's maximal depth.
        max_level: usize,
        /// Names of the agents left unresolved.
        unresolved: Vec<String>,
    },

    /// The run observed its cancellation token between rounds.
    #[error("{policy} run cancelled before round {round}")]
    Cancelled {
        /// Policy whose run was aborted.
        policy: Policy,
        /// Round that would have started next.
        round: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A concurrent policy task panicked or was aborted.
    #[error("policy task failed: {0}")]
    Join(String),
}

//! Error types for ballot loading and validation.
//!
//! Every variant here is a data-validity failure: the ballot does not
//! satisfy the contract the unravelling engine relies on. None of them
//! are recoverable by retrying.

use thiserror::Error;

/// Result type alias for ballot operations.
pub type Result<T> = std::result::Result<T, BallotError>;

/// Reasons a single delegation cell fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// The cell references an agent that is not on the roster.
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    /// An unexpected character or token was found.
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken {
        /// The offending token, rendered as text.
        found: String,
        /// Byte offset inside the cell.
        position: usize,
    },

    /// The input ended where more was expected.
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd {
        /// What the parser was waiting for.
        expected: &'static str,
    },

    /// An aggregation form lists no participants.
    #[error("{form} has no participants")]
    NoParticipants {
        /// The aggregation keyword (`maj`, `quota`, `rule`).
        form: &'static str,
    },

    /// A quota threshold is outside `1..=participants`.
    #[error("quota threshold {threshold} outside 1..={participants}")]
    QuotaOutOfRange {
        /// The threshold given.
        threshold: usize,
        /// Number of participants.
        participants: usize,
    },

    /// A voting rule fraction is malformed or outside (0, 1].
    #[error("invalid voting rule fraction '{0}'")]
    InvalidFraction(String),
}

/// Errors raised while building, loading or generating a profile.
///
/// All of these map onto the engine's `DataInvalid` error kind.
#[derive(Debug, Error)]
pub enum BallotError {
    /// A cell failed to parse against the delegation grammar.
    #[error("agent {agent}, level {level}: cannot parse '{cell}': {source}")]
    InvalidCell {
        /// Agent name owning the cell.
        agent: String,
        /// 1-based preference level.
        level: usize,
        /// Raw cell text.
        cell: String,
        /// Underlying parse failure.
        #[source]
        source: CellError,
    },

    /// An agent never casts a direct vote.
    #[error("agent {agent} has no direct vote at or before level {max_level}")]
    MissingTerminalVote {
        /// Agent name.
        agent: String,
        /// The profile's maximal depth.
        max_level: usize,
    },

    /// A blank cell appears before the agent's direct vote.
    #[error("agent {agent} has a blank cell at level {level} before its direct vote")]
    BlankBeforeTerminal {
        /// Agent name.
        agent: String,
        /// 1-based level of the blank.
        level: usize,
    },

    /// A non-blank cell appears after the agent's direct vote.
    #[error("agent {agent} has an expression at level {level} after its direct vote")]
    CellAfterTerminal {
        /// Agent name.
        agent: String,
        /// 1-based level of the stray cell.
        level: usize,
    },

    /// A row is longer than the declared depth.
    #[error("agent {agent} lists {found} levels but the profile depth is {max_level}")]
    InconsistentDepth {
        /// Agent name.
        agent: String,
        /// Number of cells found.
        found: usize,
        /// Declared depth.
        max_level: usize,
    },

    /// Number of rows differs from the roster size.
    #[error("profile has {rows} rows for {agents} agents")]
    RowCountMismatch {
        /// Rows supplied.
        rows: usize,
        /// Agents on the roster.
        agents: usize,
    },

    /// A programmatically built expression fails structural checks.
    #[error("agent {agent}, level {level}: {source}")]
    InvalidExpression {
        /// Agent name.
        agent: String,
        /// 1-based level.
        level: usize,
        /// Structural failure.
        #[source]
        source: CellError,
    },

    /// The roster is malformed (bad or duplicate names).
    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    /// The ballot has no agents or no levels.
    #[error("ballot is empty")]
    Empty,

    /// Some rows are named and others are not.
    #[error("line {line}: either every row carries an agent name or none does")]
    MixedNaming {
        /// 1-based line number of the first inconsistent row.
        line: usize,
    },

    /// Generator parameters are unusable.
    #[error("invalid generator configuration: {0}")]
    InvalidGenerator(String),

    /// Ballot file could not be read or written.
    #[error("ballot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_cell_display() {
        let err = BallotError::InvalidCell {
            agent: "B".to_string(),
            level: 2,
            cell: "maj()".to_string(),
            source: CellError::NoParticipants { form: "maj" },
        };
        let text = err.to_string();
        assert!(text.contains("agent B"));
        assert!(text.contains("level 2"));
        assert!(text.contains("maj has no participants"));
    }

    #[test]
    fn test_missing_terminal_display() {
        let err = BallotError::MissingTerminalVote {
            agent: "C".to_string(),
            max_level: 3,
        };
        assert!(err.to_string().contains("no direct vote at or before level 3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: BallotError = io.into();
        assert!(err.to_string().contains("missing.csv"));
    }
}

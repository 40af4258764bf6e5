//! # Smart Ballot Model
//!
//! Typed delegation expressions and the immutable profile table the
//! unravelling engine reads from.
//!
//! ## Overview
//!
//! A smart ballot gives every agent one expression per preference level.
//! At some level each agent casts a direct vote; before that level it
//! delegates, possibly conditionally:
//!
//! | Cell | Expression |
//! |------|------------|
//! | `0`, `1` | [`DelegationExpression::DirectVote`] |
//! | `B`, `~B` | [`DelegationExpression::Delegate`] |
//! | `maj(A B C)` | [`DelegationExpression::Majority`] |
//! | `quota(2; A B C)` | [`DelegationExpression::Quota`] |
//! | `rule(2/3; A B C)` | [`DelegationExpression::VotingRule`] |
//! | `~A&(B\|C)` | [`DelegationExpression::Formula`] |
//! | `-` | [`DelegationExpression::Blank`] |
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Roster`] | Ordered agents and their names |
//! | [`parse_cell`] | Cell grammar, parsed once into a typed tree |
//! | [`Profile`] | Validated (agent, level) table |
//! | [`BallotReader`] | Ballot text files |
//! | [`generate`] | Seeded synthetic ballots |
//! | [`write_batch`], [`load_ballot_dir`] | Directories of numbered ballot files |
//!
//! ## Example
//!
//! ```rust
//! use unravel_ballot::{parse_ballot, AgentId, Bit};
//!
//! let profile = parse_ballot("0\nA,1\nmaj(A B),0\n")?;
//! assert_eq!(profile.agent_count(), 3);
//! assert_eq!(profile.max_level(), 2);
//! assert_eq!(profile.cell(AgentId::new(0), 1).direct_vote(), Some(Bit::Zero));
//! # Ok::<(), unravel_ballot::BallotError>(())
//! ```

mod agent;
mod error;
mod expression;
mod generator;
mod loader;
mod parser;
mod profile;

pub use agent::{default_name, AgentId, Roster};
pub use error::{BallotError, CellError, Result};
pub use expression::{Bit, DelegationExpression, Formula, Fraction, Rendered};
pub use generator::{generate, generate_batch, FormWeights, GeneratorConfig};
pub use loader::{
    load_ballot, load_ballot_dir, parse_ballot, write_ballot, write_batch, BallotReader,
};
pub use parser::{parse_cell, parse_fraction};
pub use profile::Profile;

//! # Resolvability Logic
//!
//! Decides whether a delegation expression already has a value given the
//! outcomes known at the start of a round.
//!
//! ## Overview
//!
//! Each policy run owns an [`OutcomeVector`]. At the start of every round
//! the scheduler freezes it into a [`Snapshot`]; every decision in that
//! round reads the snapshot through [`Resolvable::resolve`], so commits
//! made mid-round never influence their siblings.
//!
//! | Expression | Resolved when |
//! |------------|---------------|
//! | Direct vote | always |
//! | Delegate | target known |
//! | Majority | one bit held by more than half the participants |
//! | Quota `k` | `k` ones known, or more than `n - k` zeros |
//! | Voting rule `p` | a bit reaches `ceil(p * n)` votes |
//! | Formula | Kleene three-valued evaluation is decided |
//! | Blank | never |
//!
//! ## Example
//!
//! ```rust
//! use unravel_ballot::{parse_cell, Bit, Roster};
//! use unravel_logic::{Resolvable, Resolution, Snapshot};
//!
//! let roster = Roster::with_default_names(2);
//! let expr = parse_cell("A&B", &roster).unwrap();
//! let y = Snapshot::from_outcomes(vec![Some(Bit::Zero), None]);
//! assert_eq!(expr.resolve(&y), Resolution::Resolved(Bit::Zero));
//! ```

mod evaluator;
mod outcome;
mod tally;

pub use evaluator::{resolve, Resolution, Resolvable};
pub use outcome::{OutcomeVector, Snapshot};
pub use tally::Tally;

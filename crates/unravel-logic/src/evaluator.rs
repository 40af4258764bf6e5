//! Three-valued resolvability of delegation expressions.
//!
//! An expression is evaluated against a [`Snapshot`] of the round's
//! starting outcomes. Unresolved agents behave as an unknown third value
//! under Kleene's strong logic: `0 & x = 0`, `1 | x = 1`, and the result
//! is unknown only when the known values cannot decide it.

use serde::{Deserialize, Serialize};
use std::fmt;
use unravel_ballot::{Bit, DelegationExpression, Formula};

use crate::outcome::Snapshot;
use crate::tally::Tally;

/// Outcome of evaluating an expression against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// The expression's value is determined.
    Resolved(Bit),
    /// The known outcomes do not yet decide the expression.
    Unresolved,
}

impl Resolution {
    /// The resolved bit, if any.
    pub fn bit(self) -> Option<Bit> {
        match self {
            Resolution::Resolved(b) => Some(b),
            Resolution::Unresolved => None,
        }
    }

    /// Returns true for [`Resolution::Resolved`].
    pub fn is_resolved(self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    fn negate_if(self, negated: bool) -> Self {
        match self {
            Resolution::Resolved(b) => Resolution::Resolved(b.negate_if(negated)),
            Resolution::Unresolved => Resolution::Unresolved,
        }
    }
}

impl From<Option<Bit>> for Resolution {
    fn from(value: Option<Bit>) -> Self {
        value.map_or(Resolution::Unresolved, Resolution::Resolved)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Resolved(b) => write!(f, "{}", b),
            Resolution::Unresolved => write!(f, "?"),
        }
    }
}

/// Anything whose value can be decided from a round snapshot.
pub trait Resolvable {
    /// Evaluates `self` against `snapshot`. Pure and side-effect free.
    fn resolve(&self, snapshot: &Snapshot) -> Resolution;
}

impl Resolvable for DelegationExpression {
    fn resolve(&self, snapshot: &Snapshot) -> Resolution {
        match self {
            DelegationExpression::DirectVote(b) => Resolution::Resolved(*b),
            DelegationExpression::Delegate { target, negated } => {
                Resolution::from(snapshot.get(*target)).negate_if(*negated)
            }
            DelegationExpression::Majority { participants } => {
                Tally::count(participants, snapshot).strict_majority().into()
            }
            DelegationExpression::Quota {
                participants,
                threshold,
            } => Tally::count(participants, snapshot)
                .quota(*threshold)
                .into(),
            DelegationExpression::VotingRule {
                participants,
                fraction,
            } => Tally::count(participants, snapshot).share(*fraction).into(),
            DelegationExpression::Formula(formula) => formula.resolve(snapshot),
            DelegationExpression::Blank => Resolution::Unresolved,
        }
    }
}

impl Resolvable for Formula {
    fn resolve(&self, snapshot: &Snapshot) -> Resolution {
        match self {
            Formula::Literal { agent, negated } => {
                Resolution::from(snapshot.get(*agent)).negate_if(*negated)
            }
            Formula::Not(inner) => inner.resolve(snapshot).negate_if(true),
            Formula::And(l, r) => match (l.resolve(snapshot), r.resolve(snapshot)) {
                (Resolution::Resolved(Bit::Zero), _) | (_, Resolution::Resolved(Bit::Zero)) => {
                    Resolution::Resolved(Bit::Zero)
                }
                (Resolution::Resolved(Bit::One), Resolution::Resolved(Bit::One)) => {
                    Resolution::Resolved(Bit::One)
                }
                _ => Resolution::Unresolved,
            },
            Formula::Or(l, r) => match (l.resolve(snapshot), r.resolve(snapshot)) {
                (Resolution::Resolved(Bit::One), _) | (_, Resolution::Resolved(Bit::One)) => {
                    Resolution::Resolved(Bit::One)
                }
                (Resolution::Resolved(Bit::Zero), Resolution::Resolved(Bit::Zero)) => {
                    Resolution::Resolved(Bit::Zero)
                }
                _ => Resolution::Unresolved,
            },
        }
    }
}

/// Evaluates `expr` against `snapshot`.
///
/// # Example
///
/// ```rust
/// use unravel_ballot::{AgentId, Bit, DelegationExpression};
/// use unravel_logic::{resolve, Resolution, Snapshot};
///
/// let quota = DelegationExpression::Quota {
///     participants: (0..3).map(AgentId::new).collect(),
///     threshold: 2,
/// };
/// let y = Snapshot::from_outcomes(vec![Some(Bit::One), Some(Bit::One), None]);
/// assert_eq!(resolve(&quota, &y), Resolution::Resolved(Bit::One));
/// ```
pub fn resolve(expr: &DelegationExpression, snapshot: &Snapshot) -> Resolution {
    expr.resolve(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unravel_ballot::{parse_cell, AgentId, Fraction, Roster};

    fn snapshot(cells: &[Option<u8>]) -> Snapshot {
        Snapshot::from_outcomes(
            cells
                .iter()
                .map(|c| c.map(|v| Bit::from_bool(v == 1)))
                .collect(),
        )
    }

    fn cell(text: &str) -> DelegationExpression {
        parse_cell(text, &Roster::with_default_names(4)).unwrap()
    }

    fn ids(n: usize) -> Vec<AgentId> {
        (0..n).map(AgentId::new).collect()
    }

    const ONE: Resolution = Resolution::Resolved(Bit::One);
    const ZERO: Resolution = Resolution::Resolved(Bit::Zero);
    const UNKNOWN: Resolution = Resolution::Unresolved;

    #[test]
    fn test_direct_vote_always_resolved() {
        let y = snapshot(&[None, None]);
        assert_eq!(resolve(&cell("1"), &y), ONE);
        assert_eq!(resolve(&cell("0"), &y), ZERO);
    }

    #[test]
    fn test_blank_never_resolved() {
        let y = snapshot(&[Some(1), Some(1), Some(1), Some(1)]);
        assert_eq!(resolve(&DelegationExpression::Blank, &y), UNKNOWN);
    }

    #[test]
    fn test_delegate_and_negated_delegate() {
        let y = snapshot(&[Some(1), None, None, None]);
        assert_eq!(resolve(&cell("A"), &y), ONE);
        assert_eq!(resolve(&cell("~A"), &y), ZERO);
        assert_eq!(resolve(&cell("B"), &y), UNKNOWN);
        assert_eq!(resolve(&cell("~B"), &y), UNKNOWN);
    }

    #[test]
    fn test_quota_resolution() {
        let quota = DelegationExpression::Quota {
            participants: ids(3),
            threshold: 2,
        };
        assert_eq!(resolve(&quota, &snapshot(&[Some(1), Some(1), None])), ONE);
        assert_eq!(resolve(&quota, &snapshot(&[Some(0), Some(0), None])), ZERO);
        assert_eq!(resolve(&quota, &snapshot(&[Some(1), None, None])), UNKNOWN);
        assert_eq!(resolve(&quota, &snapshot(&[Some(1), Some(0), None])), UNKNOWN);
    }

    #[test]
    fn test_majority_resolution() {
        let maj = DelegationExpression::Majority {
            participants: ids(3),
        };
        assert_eq!(resolve(&maj, &snapshot(&[Some(1), Some(1), None])), ONE);
        assert_eq!(resolve(&maj, &snapshot(&[Some(0), None, Some(0)])), ZERO);
        assert_eq!(resolve(&maj, &snapshot(&[Some(1), Some(0), None])), UNKNOWN);

        let even = DelegationExpression::Majority {
            participants: ids(4),
        };
        let tied = snapshot(&[Some(1), Some(1), Some(0), Some(0)]);
        assert_eq!(resolve(&even, &tied), UNKNOWN);
    }

    #[test]
    fn test_voting_rule_resolution() {
        let rule = DelegationExpression::VotingRule {
            participants: ids(3),
            fraction: Fraction::new(2, 3).unwrap(),
        };
        assert_eq!(resolve(&rule, &snapshot(&[Some(1), Some(1), None])), ONE);
        assert_eq!(resolve(&rule, &snapshot(&[None, Some(0), Some(0)])), ZERO);
        assert_eq!(resolve(&rule, &snapshot(&[Some(1), Some(0), None])), UNKNOWN);
    }

    #[test]
    fn test_voting_rule_mirrors_quota() {
        let known = snapshot(&[Some(1), Some(1), Some(0), None]);
        assert_eq!(resolve(&cell("quota(3; A B C)"), &known), ZERO);
        assert_eq!(resolve(&cell("rule(1; A B C)"), &known), ZERO);

        let partial = snapshot(&[Some(0), Some(0), None, None]);
        assert_eq!(resolve(&cell("quota(3; A B C D)"), &partial), ZERO);
        assert_eq!(resolve(&cell("rule(3/4; A B C D)"), &partial), ZERO);
        assert_eq!(resolve(&cell("rule(0.75; A B C D)"), &partial), ZERO);

        let one_zero = snapshot(&[Some(0), None, None, None]);
        assert_eq!(resolve(&cell("rule(3/4; A B C D)"), &one_zero), UNKNOWN);
    }

    #[test]
    fn test_formula_short_circuit() {
        let and = cell("A&B");
        assert_eq!(resolve(&and, &snapshot(&[Some(0), None])), ZERO);
        assert_eq!(resolve(&and, &snapshot(&[None, Some(0)])), ZERO);
        assert_eq!(resolve(&and, &snapshot(&[Some(1), None])), UNKNOWN);
        assert_eq!(resolve(&and, &snapshot(&[Some(1), Some(1)])), ONE);

        let or = cell("A|B");
        assert_eq!(resolve(&or, &snapshot(&[Some(1), None])), ONE);
        assert_eq!(resolve(&or, &snapshot(&[None, Some(1)])), ONE);
        assert_eq!(resolve(&or, &snapshot(&[Some(0), None])), UNKNOWN);
        assert_eq!(resolve(&or, &snapshot(&[Some(0), Some(0)])), ZERO);
    }

    #[test]
    fn test_formula_negation() {
        let y = snapshot(&[Some(1), None, Some(0)]);
        assert_eq!(resolve(&cell("~A|B"), &y), UNKNOWN);
        assert_eq!(resolve(&cell("~C|B"), &y), ONE);
        assert_eq!(resolve(&cell("~(A|B)"), &y), ZERO);
        assert_eq!(resolve(&cell("~(C&B)"), &y), ONE);
    }

    #[test]
    fn test_formula_left_associative() {
        // (A&B)|C with A=0, C=1 resolves to 1; A&(B|C) would be 0.
        let y = snapshot(&[Some(0), None, Some(1)]);
        assert_eq!(resolve(&cell("A&B|C"), &y), ONE);
        assert_eq!(resolve(&cell("A&(B|C)"), &y), ZERO);
    }

    #[test]
    fn test_resolution_helpers() {
        assert_eq!(ONE.bit(), Some(Bit::One));
        assert_eq!(UNKNOWN.bit(), None);
        assert!(ZERO.is_resolved());
        assert_eq!(Resolution::from(None::<Bit>), UNKNOWN);
        assert_eq!(UNKNOWN.to_string(), "?");
    }
}

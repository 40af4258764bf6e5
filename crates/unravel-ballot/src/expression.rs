//! Typed delegation expressions.
//!
//! Each ballot cell is parsed once into a [`DelegationExpression`]. Boolean
//! formulas become a [`Formula`] tree, so grouping is explicit and nothing
//! downstream ever rewrites text.

use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, Roster};
use crate::error::CellError;

/// A binary outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bit {
    /// Outcome `0`.
    Zero,
    /// Outcome `1`.
    One,
}

impl Bit {
    /// Converts from a boolean (`true` is `One`).
    pub fn from_bool(value: bool) -> Self {
        if value {
            Bit::One
        } else {
            Bit::Zero
        }
    }

    /// Returns `0` or `1`.
    pub fn as_u8(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }

    /// Flips the bit when `negated` is set.
    pub fn negate_if(self, negated: bool) -> Self {
        if negated {
            !self
        } else {
            self
        }
    }
}

impl Not for Bit {
    type Output = Bit;

    fn not(self) -> Bit {
        match self {
            Bit::Zero => Bit::One,
            Bit::One => Bit::Zero,
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Exact rational threshold in `(0, 1]` for a voting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    numerator: u32,
    denominator: u32,
}

impl Fraction {
    /// The whole participant set.
    pub const ONE: Fraction = Fraction {
        numerator: 1,
        denominator: 1,
    };

    /// Creates a reduced fraction, or `None` unless `0 < numerator <= denominator`.
    pub fn new(numerator: u32, denominator: u32) -> Option<Self> {
        if numerator == 0 || denominator == 0 || numerator > denominator {
            return None;
        }
        let g = gcd(numerator, denominator);
        Some(Self {
            numerator: numerator / g,
            denominator: denominator / g,
        })
    }

    /// Numerator of the reduced fraction.
    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    /// Denominator of the reduced fraction.
    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Smallest count `k` with `k / total >= self`, i.e. `ceil(self * total)`.
    pub fn threshold_of(&self, total: usize) -> usize {
        let num = u64::from(self.numerator) * total as u64;
        let den = u64::from(self.denominator);
        num.div_ceil(den) as usize
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Boolean formula over agent literals.
///
/// Chains are left-associative with equal precedence for `&` and `|`;
/// `A&B|C` is `(A&B)|C`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formula {
    /// Reference to an agent's outcome, optionally negated.
    Literal {
        /// The referenced agent.
        agent: AgentId,
        /// Whether the literal carries `~`.
        negated: bool,
    },
    /// Negation of a grouped sub-formula.
    Not(Box<Formula>),
    /// Conjunction.
    And(Box<Formula>, Box<Formula>),
    /// Disjunction.
    Or(Box<Formula>, Box<Formula>),
}

impl Formula {
    /// Plain literal for `agent`.
    pub fn literal(agent: AgentId) -> Self {
        Formula::Literal {
            agent,
            negated: false,
        }
    }

    /// Negated literal for `agent`.
    pub fn negated(agent: AgentId) -> Self {
        Formula::Literal {
            agent,
            negated: true,
        }
    }

    /// `self & other`.
    pub fn and(self, other: Formula) -> Self {
        Formula::And(Box::new(self), Box::new(other))
    }

    /// `self | other`.
    pub fn or(self, other: Formula) -> Self {
        Formula::Or(Box::new(self), Box::new(other))
    }

    /// Applies `~`, folding into a literal's own negation flag.
    pub fn invert(self) -> Self {
        match self {
            Formula::Literal { agent, negated } => Formula::Literal {
                agent,
                negated: !negated,
            },
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    fn collect_agents(&self, out: &mut Vec<AgentId>) {
        match self {
            Formula::Literal { agent, .. } => out.push(*agent),
            Formula::Not(inner) => inner.collect_agents(out),
            Formula::And(l, r) | Formula::Or(l, r) => {
                l.collect_agents(out);
                r.collect_agents(out);
            }
        }
    }

    fn render_into(&self, roster: &Roster, out: &mut String) {
        match self {
            Formula::Literal { agent, negated } => {
                if *negated {
                    out.push('~');
                }
                out.push_str(roster.name(*agent));
            }
            Formula::Not(inner) => {
                out.push_str("~(");
                inner.render_into(roster, out);
                out.push(')');
            }
            Formula::And(l, r) | Formula::Or(l, r) => {
                let op = if matches!(self, Formula::And(..)) { '&' } else { '|' };
                l.render_into(roster, out);
                out.push(op);
                // Left-associative chains only need parentheses on the right.
                if matches!(**r, Formula::And(..) | Formula::Or(..)) {
                    out.push('(');
                    r.render_into(roster, out);
                    out.push(')');
                } else {
                    r.render_into(roster, out);
                }
            }
        }
    }
}

/// One ballot cell: how an agent's vote is determined at a preference level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelegationExpression {
    /// Terminal direct vote.
    DirectVote(Bit),
    /// Copy (or negate) a single agent's outcome.
    Delegate {
        /// Agent whose outcome is adopted.
        target: AgentId,
        /// Whether the adopted bit is flipped.
        negated: bool,
    },
    /// Strict majority over the participants.
    Majority {
        /// Participants, in ballot order.
        participants: Vec<AgentId>,
    },
    /// `1` once `threshold` participants vote `1`.
    Quota {
        /// Participants, in ballot order.
        participants: Vec<AgentId>,
        /// Number of `1` votes required.
        threshold: usize,
    },
    /// Threshold expressed as a fraction of the participants.
    VotingRule {
        /// Participants, in ballot order.
        participants: Vec<AgentId>,
        /// Required share in `(0, 1]`.
        fraction: Fraction,
    },
    /// General boolean formula.
    Formula(Formula),
    /// No expression: the level lies past the agent's direct vote.
    Blank,
}

impl DelegationExpression {
    /// The bit of a direct vote, if this is one.
    pub fn direct_vote(&self) -> Option<Bit> {
        match self {
            DelegationExpression::DirectVote(bit) => Some(*bit),
            _ => None,
        }
    }

    /// Returns true for a blank cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, DelegationExpression::Blank)
    }

    /// Short keyword naming the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            DelegationExpression::DirectVote(_) => "direct",
            DelegationExpression::Delegate { .. } => "delegate",
            DelegationExpression::Majority { .. } => "maj",
            DelegationExpression::Quota { .. } => "quota",
            DelegationExpression::VotingRule { .. } => "rule",
            DelegationExpression::Formula(_) => "formula",
            DelegationExpression::Blank => "blank",
        }
    }

    /// Agents this expression depends on, sorted and deduplicated.
    pub fn references(&self) -> Vec<AgentId> {
        let mut agents = match self {
            DelegationExpression::DirectVote(_) | DelegationExpression::Blank => Vec::new(),
            DelegationExpression::Delegate { target, .. } => vec![*target],
            DelegationExpression::Majority { participants }
            | DelegationExpression::Quota { participants, .. }
            | DelegationExpression::VotingRule { participants, .. } => participants.clone(),
            DelegationExpression::Formula(formula) => {
                let mut out = Vec::new();
                formula.collect_agents(&mut out);
                out
            }
        };
        agents.sort_unstable();
        agents.dedup();
        agents
    }

    /// Checks structural constraints that do not depend on the roster.
    pub fn validate(&self) -> Result<(), CellError> {
        match self {
            DelegationExpression::Majority { participants } if participants.is_empty() => {
                Err(CellError::NoParticipants { form: "maj" })
            }
            DelegationExpression::Quota { participants, .. } if participants.is_empty() => {
                Err(CellError::NoParticipants { form: "quota" })
            }
            DelegationExpression::Quota {
                participants,
                threshold,
            } if *threshold == 0 || *threshold > participants.len() => {
                Err(CellError::QuotaOutOfRange {
                    threshold: *threshold,
                    participants: participants.len(),
                })
            }
            DelegationExpression::VotingRule { participants, .. } if participants.is_empty() => {
                Err(CellError::NoParticipants { form: "rule" })
            }
            _ => Ok(()),
        }
    }

    /// Renders the expression in ballot-cell syntax using `roster` names.
    pub fn display<'a>(&'a self, roster: &'a Roster) -> Rendered<'a> {
        Rendered { expr: self, roster }
    }
}

/// Ballot-cell rendering of an expression; see [`DelegationExpression::display`].
pub struct Rendered<'a> {
    expr: &'a DelegationExpression,
    roster: &'a Roster,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |participants: &[AgentId]| {
            participants
                .iter()
                .map(|a| self.roster.name(*a))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self.expr {
            DelegationExpression::DirectVote(bit) => write!(f, "{bit}"),
            DelegationExpression::Delegate { target, negated } => {
                let tilde = if *negated { "~" } else { "" };
                write!(f, "{tilde}{}", self.roster.name(*target))
            }
            DelegationExpression::Majority { participants } => {
                write!(f, "maj({})", names(participants))
            }
            DelegationExpression::Quota {
                participants,
                threshold,
            } => write!(f, "quota({threshold}; {})", names(participants)),
            DelegationExpression::VotingRule {
                participants,
                fraction,
            } => write!(f, "rule({fraction}; {})", names(participants)),
            DelegationExpression::Formula(formula) => {
                let mut out = String::new();
                formula.render_into(self.roster, &mut out);
                f.write_str(&out)
            }
            DelegationExpression::Blank => f.write_str("-"),
        }
    }
}

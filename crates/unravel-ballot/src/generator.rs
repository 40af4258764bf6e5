//! Synthetic smart-ballot generation.
//!
//! Each agent draws a personal delegation probability from
//! `delegation_bounds`. At every level it either votes directly (ending
//! its row) or delegates to a random non-empty subset of the other
//! agents; the last level always holds a direct vote, so every generated
//! profile satisfies the termination guarantee.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentId, Roster};
use crate::error::{BallotError, Result};
use crate::expression::{Bit, DelegationExpression, Formula, Fraction};
use crate::profile::Profile;

/// Relative weights of the multi-agent delegation forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormWeights {
    /// `maj(...)`.
    pub majority: u32,
    /// Flat `&`/`|` formula.
    pub formula: u32,
    /// `quota(k; ...)`.
    pub quota: u32,
    /// `rule(p; ...)`.
    pub rule: u32,
}

impl Default for FormWeights {
    fn default() -> Self {
        Self {
            majority: 1,
            formula: 1,
            quota: 1,
            rule: 1,
        }
    }
}

/// Parameters of the synthetic generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of agents.
    pub agents: usize,
    /// Preference levels per ballot.
    pub levels: usize,
    /// Range the per-agent delegation probability is drawn from.
    pub delegation_bounds: (f64, f64),
    /// Weights of the multi-agent forms.
    pub forms: FormWeights,
    /// Chance that a formula literal is negated.
    pub negation_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            levels: 4,
            delegation_bounds: (0.0, 1.0),
            forms: FormWeights::default(),
            negation_probability: 0.5,
        }
    }
}

impl GeneratorConfig {
    /// Checks that the parameters can produce a profile.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(BallotError::InvalidGenerator(msg.to_string()));
        let (lower, upper) = self.delegation_bounds;
        if self.agents == 0 {
            return invalid("at least one agent is required");
        }
        if self.levels == 0 {
            return invalid("at least one level is required");
        }
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper {
            return invalid("delegation bounds must satisfy 0 <= lower <= upper <= 1");
        }
        if !(0.0..=1.0).contains(&self.negation_probability) {
            return invalid("negation probability must lie in [0, 1]");
        }
        let f = &self.forms;
        if f.majority + f.formula + f.quota + f.rule == 0 {
            return invalid("at least one delegation form needs a positive weight");
        }
        Ok(())
    }

    /// File name of the `index`-th ballot in a generated batch:
    /// `{index}_{agents}_{levels}_{lower}_{upper}.csv`.
    pub fn batch_file_name(&self, index: usize) -> String {
        let (lower, upper) = self.delegation_bounds;
        format!(
            "{}_{}_{}_{}_{}.csv",
            index, self.agents, self.levels, lower, upper
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Form {
    Majority,
    Formula,
    Quota,
    Rule,
}

const FORMS: [Form; 4] = [Form::Majority, Form::Formula, Form::Quota, Form::Rule];

/// Generates a random valid profile.
///
/// # Example
///
/// ```rust
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use unravel_ballot::{generate, GeneratorConfig};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let profile = generate(&GeneratorConfig::default(), &mut rng).unwrap();
/// assert_eq!(profile.agent_count(), 5);
/// ```
pub fn generate<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> Result<Profile> {
    config.validate()?;
    let f = &config.forms;
    let weights = WeightedIndex::new([f.majority, f.formula, f.quota, f.rule])
        .map_err(|e| BallotError::InvalidGenerator(e.to_string()))?;

    let roster = Roster::with_default_names(config.agents);
    let rows = roster
        .ids()
        .map(|agent| generate_row(config, &weights, agent, &mut *rng))
        .collect();

    let profile = Profile::with_depth(roster, rows, config.levels)?;
    debug!(
        agents = config.agents,
        levels = config.levels,
        "synthetic ballot generated"
    );
    Ok(profile)
}

fn generate_row<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    weights: &WeightedIndex<u32>,
    agent: AgentId,
    rng: &mut R,
) -> Vec<DelegationExpression> {
    let others: Vec<AgentId> = (0..config.agents)
        .map(AgentId::new)
        .filter(|a| *a != agent)
        .collect();
    let (lower, upper) = config.delegation_bounds;
    let delegation_probability = if lower < upper {
        rng.gen_range(lower..=upper)
    } else {
        lower
    };

    let mut row = Vec::new();
    for level in 0..config.levels {
        let last = level + 1 == config.levels;
        if last || others.is_empty() || !rng.gen_bool(delegation_probability) {
            row.push(DelegationExpression::DirectVote(Bit::from_bool(rng.gen())));
            break;
        }

        let count = rng.gen_range(1..=others.len());
        let candidates: Vec<AgentId> = others.choose_multiple(rng, count).copied().collect();
        let expr = match candidates.as_slice() {
            [single] => DelegationExpression::Delegate {
                target: *single,
                negated: false,
            },
            _ => match FORMS[weights.sample(rng)] {
                Form::Majority => DelegationExpression::Majority {
                    participants: candidates,
                },
                Form::Formula => {
                    DelegationExpression::Formula(flat_formula(&candidates, config, rng))
                }
                Form::Quota => DelegationExpression::Quota {
                    threshold: rng.gen_range(1..=candidates.len()),
                    participants: candidates,
                },
                Form::Rule => DelegationExpression::VotingRule {
                    participants: candidates,
                    fraction: random_percentage(rng),
                },
            },
        };
        row.push(expr);
    }
    row
}

fn flat_formula<R: Rng + ?Sized>(
    candidates: &[AgentId],
    config: &GeneratorConfig,
    rng: &mut R,
) -> Formula {
    // Pick a non-empty operator set, then an operator per gap.
    let (allow_and, allow_or) = match rng.gen_range(0..3) {
        0 => (true, false),
        1 => (false, true),
        _ => (true, true),
    };
    let literal = |agent: AgentId, rng: &mut R| {
        if rng.gen_bool(config.negation_probability) {
            Formula::negated(agent)
        } else {
            Formula::literal(agent)
        }
    };

    let mut formula = literal(candidates[0], rng);
    for agent in &candidates[1..] {
        let use_and = allow_and && (!allow_or || rng.gen());
        let next = literal(*agent, rng);
        formula = if use_and {
            formula.and(next)
        } else {
            formula.or(next)
        };
    }
    formula
}

/// Generates `count` profiles drawn one after another from `rng`.
pub fn generate_batch<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Profile>> {
    (0..count).map(|_| generate(config, &mut *rng)).collect()
}

fn random_percentage<R: Rng + ?Sized>(rng: &mut R) -> Fraction {
    let percent = rng.gen_range(1..=100u32);
    Fraction::new(percent, 100).unwrap_or(Fraction::ONE)
}

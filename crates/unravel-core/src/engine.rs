//! The engine facade.
//!
//! [`Engine`] owns the run options and a cancellation token and fans a
//! profile out to the configured policies, either sequentially or on the
//! tokio blocking pool.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use unravel_ballot::Profile;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::report::{PolicyReports, RunReport};
use crate::scheduler::Scheduler;
use crate::Result;

/// Runs smart-ballot profiles under one or more resolution policies.
///
/// Each policy run owns its outcome vector and random source; runs share
/// only the read-only profile.
///
/// # Example
///
/// ```rust
/// use unravel_ballot::{parse_ballot, Bit};
/// use unravel_core::{Engine, EngineConfig, Policy};
///
/// let profile = parse_ballot("0\nA,1\nmaj(A B),0\n")?;
/// let engine = Engine::new(EngineConfig::default())?;
/// let reports = engine.run_all_seeded(&profile, 7)?;
///
/// let u = &reports[&Policy::Unconditional];
/// assert_eq!(u.rounds, 3);
/// assert_eq!(u.outcome_of("C"), Some(Bit::Zero));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    cancel: CancellationToken,
}

impl Engine {
    /// Creates an engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the engine's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A handle that cancels every run of this engine.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The configured seed, or a fresh random one.
    pub fn resolve_seed(&self) -> u64 {
        self.config.seed.unwrap_or_else(rand::random)
    }

    /// Runs a single policy, drawing randomness from `rng`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        profile: &Profile,
        policy: Policy,
        rng: &mut R,
    ) -> Result<RunReport> {
        Scheduler::new(profile, policy)
            .with_config(&self.config)
            .with_cancellation(&self.cancel)
            .run(rng)
    }

    /// Runs every configured policy sequentially.
    ///
    /// One seed per policy is drawn from `rng` in [`Policy::ALL`] order,
    /// whether or not that policy is configured, and each run gets its
    /// own generator. Results therefore depend only on `rng`'s state, not
    /// on which other policies run or in what order.
    pub fn run_all<R: Rng + ?Sized>(&self, profile: &Profile, rng: &mut R) -> Result<PolicyReports> {
        let mut reports = PolicyReports::new();
        for (policy, seed) in self.policy_seeds(rng) {
            let report = self.run(profile, policy, &mut StdRng::seed_from_u64(seed))?;
            reports.insert(policy, report);
        }
        info!(
            policies = reports.len(),
            agents = profile.agent_count(),
            "policy runs complete"
        );
        Ok(reports)
    }

    /// [`Engine::run_all`] with a generator seeded from `seed`.
    pub fn run_all_seeded(&self, profile: &Profile, seed: u64) -> Result<PolicyReports> {
        self.run_all(profile, &mut StdRng::seed_from_u64(seed))
    }

    /// Runs every configured policy on the blocking thread pool.
    ///
    /// Produces the same reports as [`Engine::run_all_seeded`] with the
    /// same seed.
    ///
    /// # Errors
    ///
    /// The first failing run's error, or [`EngineError::Join`] if a task
    /// panicked. The remaining runs are cancelled in either case.
    pub async fn run_all_concurrent(
        &self,
        profile: Arc<Profile>,
        seed: u64,
    ) -> Result<PolicyReports> {
        let seeds = self.policy_seeds(&mut StdRng::seed_from_u64(seed));
        // Cancelling the child stops sibling runs; the caller's token stays live.
        let cancel = self.cancel.child_token();
        let mut join_set = JoinSet::new();

        for (policy, seed) in seeds {
            let profile = Arc::clone(&profile);
            let engine = self.clone().with_cancellation(cancel.clone());
            join_set.spawn_blocking(move || {
                let result = engine.run(&profile, policy, &mut StdRng::seed_from_u64(seed));
                (policy, result)
            });
        }

        let mut reports = PolicyReports::new();
        let mut failure = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((policy, Ok(report))) => {
                    debug!(%policy, rounds = report.rounds, "policy task finished");
                    reports.insert(policy, report);
                }
                Ok((_, Err(e))) => {
                    cancel.cancel();
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    cancel.cancel();
                    failure.get_or_insert(EngineError::Join(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!(
                    policies = reports.len(),
                    agents = profile.agent_count(),
                    "concurrent policy runs complete"
                );
                Ok(reports)
            }
        }
    }

    fn policy_seeds<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<(Policy, u64)> {
        Policy::ALL
            .into_iter()
            .map(|policy| (policy, rng.gen::<u64>()))
            .filter(|(policy, _)| self.config.policies.contains(policy))
            .collect()
    }
}

//! The round/level unravelling loop for a single policy run.
//!
//! Every round starts from level 1 with a fresh snapshot of the outcome
//! vector and walks up the levels until some step commits. A commit made
//! at level 3 may unlock a delegation waiting at level 1, which only
//! becomes visible in the next round's snapshot.
//!
//! ```text
//! X <- all unresolved
//! while X has an unresolved agent:
//!     level <- 1; Y <- snapshot(X)
//!     while X == Y:
//!         level > L          => StuckState
//!         record cycles of dependency_graph(Y, level)
//!         policy.step(X, Y, level)
//!         level <- level + 1
//! ```

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use unravel_ballot::Profile;
use unravel_cycles::{level_cycles, CycleLedger};
use unravel_logic::OutcomeVector;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::policy::Policy;
use crate::report::{CollectiveOutcome, RunReport, TraceEntry};
use crate::Result;

/// Drives one policy run over a profile.
pub struct Scheduler<'a> {
    profile: &'a Profile,
    policy: Policy,
    cycle_analysis: bool,
    record_trace: bool,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Scheduler<'a> {
    /// Scheduler with cycle analysis on and tracing off.
    pub fn new(profile: &'a Profile, policy: Policy) -> Self {
        Self {
            profile,
            policy,
            cycle_analysis: true,
            record_trace: false,
            cancel: None,
        }
    }

    /// Applies the run options of `config`.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.cycle_analysis = config.cycle_analysis;
        self.record_trace = config.record_trace;
        self
    }

    /// Checks `token` between rounds.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs to completion.
    ///
    /// # Errors
    ///
    /// - [`EngineError::StuckState`] if a round passes the last level
    ///   without committing anything
    /// - [`EngineError::Cancelled`] if the token fires between rounds
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunReport> {
        let profile = self.profile;
        let max_level = profile.max_level();
        let mut outcome = OutcomeVector::new(profile.agent_count());
        let mut ledger = CycleLedger::new();
        let mut trace = Vec::new();
        let mut round = 0;
        let mut steps = 0;

        while !outcome.is_complete() {
            if self.cancel.is_some_and(CancellationToken::is_cancelled) {
                warn!(policy = %self.policy, round = round + 1, "run cancelled");
                return Err(EngineError::Cancelled {
                    policy: self.policy,
                    round: round + 1,
                });
            }
            round += 1;

            let snapshot = outcome.snapshot();
            let mut level = 1;
            while outcome.matches(&snapshot) {
                if level > max_level {
                    let unresolved: Vec<String> = outcome
                        .unresolved()
                        .map(|a| profile.roster().name(a).to_string())
                        .collect();
                    warn!(
                        policy = %self.policy,
                        round,
                        unresolved = unresolved.len(),
                        "no progress through the last level"
                    );
                    return Err(EngineError::StuckState {
                        policy: self.policy,
                        round,
                        max_level,
                        unresolved,
                    });
                }

                if self.cycle_analysis {
                    let fresh = ledger.record(level_cycles(profile, &snapshot, level));
                    if fresh > 0 {
                        trace!(round, level, fresh, "new cycles recorded");
                    }
                }

                let commits = self
                    .policy
                    .step(profile, &snapshot, level, &mut outcome, rng);
                steps += 1;
                if self.record_trace {
                    trace.extend(commits.into_iter().map(|commit| TraceEntry { round, commit }));
                }
                level += 1;
            }

            debug!(
                policy = %self.policy,
                round,
                levels = level - 1,
                resolved = outcome.resolved_count(),
                "round complete"
            );
        }

        debug!(
            policy = %self.policy,
            rounds = round,
            steps,
            cycles = ledger.len(),
            "run complete"
        );

        let collective = CollectiveOutcome::from_outcome(&outcome);
        Ok(RunReport {
            policy: self.policy,
            agents: profile.roster().names().to_vec(),
            outcome,
            cycle_count: ledger.len(),
            cycles: ledger.into_vec(),
            rounds: round,
            steps,
            trace,
            collective,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use unravel_ballot::{parse_ballot, AgentId, Bit};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn test_single_direct_voter() {
        let profile = parse_ballot("1\n").unwrap();
        let report = Scheduler::new(&profile, Policy::Unconditional)
            .run(&mut rng())
            .unwrap();
        assert_eq!(report.rounds, 1);
        assert_eq!(report.steps, 1);
        assert_eq!(report.outcome.get(AgentId::new(0)), Some(Bit::One));
    }

    #[test]
    fn test_mutual_delegation_falls_through_to_direct_votes() {
        // A and B delegate to each other at level 1, vote at level 2.
        let profile = parse_ballot("B,0\nA,1\n").unwrap();
        let report = Scheduler::new(&profile, Policy::Unconditional)
            .run(&mut rng())
            .unwrap();
        assert_eq!(report.rounds, 1);
        assert_eq!(report.steps, 2);
        assert_eq!(report.outcome_of("A"), Some(Bit::Zero));
        assert_eq!(report.outcome_of("B"), Some(Bit::One));
        assert_eq!(report.cycle_count, 1);
        assert_eq!(report.render_cycles(), vec!["A -> B -> A".to_string()]);
    }

    #[test]
    fn test_cycle_analysis_can_be_disabled() {
        let profile = parse_ballot("B,0\nA,1\n").unwrap();
        let config = EngineConfig::default().with_cycle_analysis(false);
        let report = Scheduler::new(&profile, Policy::Unconditional)
            .with_config(&config)
            .run(&mut rng())
            .unwrap();
        assert_eq!(report.cycle_count, 0);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn test_trace_records_rounds() {
        let profile = parse_ballot("0\nA,1\nmaj(A B),0\n").unwrap();
        let config = EngineConfig::default().with_trace(true);
        let report = Scheduler::new(&profile, Policy::Unconditional)
            .with_config(&config)
            .run(&mut rng())
            .unwrap();
        let rounds: Vec<(usize, usize)> = report
            .trace
            .iter()
            .map(|e| (e.round, e.commit.agent.index()))
            .collect();
        assert_eq!(rounds, vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[test]
    fn test_stuck_state_detected() {
        use unravel_ballot::{DelegationExpression, Roster};

        // B never votes directly: its only cell delegates to itself.
        let rows = vec![
            vec![DelegationExpression::DirectVote(Bit::One)],
            vec![DelegationExpression::Delegate {
                target: AgentId::new(1),
                negated: false,
            }],
        ];
        let profile = Profile::new_unvalidated(Roster::with_default_names(2), rows, 1).unwrap();
        let err = Scheduler::new(&profile, Policy::Unconditional)
            .run(&mut rng())
            .unwrap_err();
        match err {
            EngineError::StuckState {
                round,
                max_level,
                unresolved,
                ..
            } => {
                assert_eq!(round, 2);
                assert_eq!(max_level, 1);
                assert_eq!(unresolved, vec!["B".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_before_first_round() {
        let profile = parse_ballot("1\n").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let err = Scheduler::new(&profile, Policy::Randomized)
            .with_cancellation(&token)
            .run(&mut rng())
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled { round: 1, .. }));
    }
}

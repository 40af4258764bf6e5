//! Configuration types for the unravelling engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use unravel_ballot::GeneratorConfig;

use crate::error::EngineError;
use crate::policy::Policy;
use crate::Result;

/// Top-level configuration, usually read from a TOML file.
///
/// ```toml
/// [engine]
/// policies = ["U", "DRU"]
/// seed = 42
///
/// [generator]
/// agents = 8
/// levels = 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnravelConfig {
    /// Engine settings.
    pub engine: EngineConfig,

    /// Synthetic ballot generator settings.
    pub generator: GeneratorConfig,
}

impl UnravelConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text).map_err(|e| match e {
            EngineError::Config(msg) => {
                EngineError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks both sections.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.generator
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Policies to run.
    ///
    /// Selects policies only: runs, seeds and reports always follow the
    /// order of [`Policy::ALL`], whatever order they are listed in.
    pub policies: Vec<Policy>,

    /// Seed for the randomized policies; drawn at random when absent.
    pub seed: Option<u64>,

    /// Run policies on the blocking thread pool instead of sequentially.
    pub concurrent: bool,

    /// Collect per-level cycle statistics.
    pub cycle_analysis: bool,

    /// Record every commit in the run report.
    pub record_trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policies: Policy::ALL.to_vec(),
            seed: None,
            concurrent: false,
            cycle_analysis: true,
            record_trace: false,
        }
    }
}

impl EngineConfig {
    /// Requires at least one policy and no repeats.
    pub fn validate(&self) -> Result<()> {
        if self.policies.is_empty() {
            return Err(EngineError::Config("no policies selected".into()));
        }
        for (i, policy) in self.policies.iter().enumerate() {
            if self.policies[..i].contains(policy) {
                return Err(EngineError::Config(format!(
                    "policy {} listed more than once",
                    policy
                )));
            }
        }
        Ok(())
    }

    /// Replaces the policy list.
    pub fn with_policies(mut self, policies: impl IntoIterator<Item = Policy>) -> Self {
        self.policies = policies.into_iter().collect();
        self
    }

    /// Fixes the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables commit tracing.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.record_trace = enabled;
        self
    }

    /// Enables or disables cycle analysis.
    pub fn with_cycle_analysis(mut self, enabled: bool) -> Self {
        self.cycle_analysis = enabled;
        self
    }
}

//! TOML playback configuration.
//!
//! A `PlaybackConfig` overrides the built-in settings of a simulation module.
//! Every key is optional; an absent key keeps the module's own value.
//!
//! ```toml
//! [pacing]
//! warmup_ms = 100
//! stage_enter_ms = 400
//! line_delay_min_ms = 150
//! line_delay_max_ms = 250
//! stage_gap_ms = 300
//!
//! [outcome]
//! mode = "scenario"            # "always-succeed" | "random" | "scenario"
//! failure_probability = 0.05
//! fallback = "always-succeed"  # scenario mode only: "always-succeed" | "random"
//! seed = 7
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use stagehand_contracts::error::{StageError, StageResult};
use stagehand_core::{
    pacing::Pacing,
    traits::{OutcomePolicy, RandomSource},
};

use crate::{
    outcome::{AlwaysSucceed, RandomFailure, ScenarioPolicy},
    random::FastRandSource,
};

/// Failure probability of the GitHub Actions simulator.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.05;

/// Which policy family decides step outcomes.
///
/// ```toml
/// mode = "always-succeed"
/// mode = "random"
/// mode = "scenario"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeMode {
    AlwaysSucceed,
    Random,
    Scenario,
}

/// What a scenario policy does for steps the scenario does not designate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fallback {
    AlwaysSucceed,
    Random,
}

/// Fully resolved outcome settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeSettings {
    pub mode: OutcomeMode,
    pub failure_probability: f64,
    pub fallback: Fallback,
    pub seed: Option<u64>,
}

impl OutcomeSettings {
    /// Scripted failures only.
    pub const fn scripted() -> Self {
        Self {
            mode: OutcomeMode::Scenario,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
            fallback: Fallback::AlwaysSucceed,
            seed: None,
        }
    }

    /// Scripted failures when designated, otherwise random with `probability`.
    pub const fn scripted_or_random(probability: f64) -> Self {
        Self {
            mode: OutcomeMode::Scenario,
            failure_probability: probability,
            fallback: Fallback::Random,
            seed: None,
        }
    }

    /// Never fails.
    pub const fn always_succeed() -> Self {
        Self {
            mode: OutcomeMode::AlwaysSucceed,
            failure_probability: 0.0,
            fallback: Fallback::AlwaysSucceed,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.seed = seed;
        }
        self
    }

    /// Build the policy these settings describe.
    pub fn build_policy(&self) -> Box<dyn OutcomePolicy> {
        let random = || -> Box<dyn OutcomePolicy> {
            Box::new(RandomFailure::new(
                self.failure_probability,
                self.source(POLICY_STREAM),
            ))
        };
        match (self.mode, self.fallback) {
            (OutcomeMode::AlwaysSucceed, _) => Box::new(AlwaysSucceed),
            (OutcomeMode::Random, _) => random(),
            (OutcomeMode::Scenario, Fallback::AlwaysSucceed) => {
                Box::new(ScenarioPolicy::deterministic())
            }
            (OutcomeMode::Scenario, Fallback::Random) => Box::new(ScenarioPolicy::new(random())),
        }
    }

    /// The source for line-delay jitter. Independent of the policy's draws.
    pub fn jitter_source(&self) -> Box<dyn RandomSource> {
        self.source(JITTER_STREAM)
    }

    fn source(&self, stream: u64) -> Box<dyn RandomSource> {
        match self.seed {
            Some(seed) => Box::new(FastRandSource::with_seed(seed ^ stream)),
            None => Box::new(FastRandSource::new()),
        }
    }
}

impl Default for OutcomeSettings {
    fn default() -> Self {
        Self::scripted()
    }
}

const POLICY_STREAM: u64 = 0;
const JITTER_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// `[pacing]` overrides, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingOverrides {
    pub warmup_ms: Option<u64>,
    pub stage_enter_ms: Option<u64>,
    pub line_delay_min_ms: Option<u64>,
    pub line_delay_max_ms: Option<u64>,
    pub stage_gap_ms: Option<u64>,
}

/// `[outcome]` overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutcomeOverrides {
    pub mode: Option<OutcomeMode>,
    pub failure_probability: Option<f64>,
    pub fallback: Option<Fallback>,
    pub seed: Option<u64>,
}

/// The top-level structure deserialized from a playback TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub pacing: PacingOverrides,
    #[serde(default)]
    pub outcome: OutcomeOverrides,
}

impl PlaybackConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `StageError::Config` if the TOML is malformed, has unknown
    /// keys, or carries out-of-range values.
    pub fn from_toml_str(s: &str) -> StageResult<Self> {
        let config: PlaybackConfig = toml::from_str(s).map_err(|e| StageError::Config {
            reason: format!("failed to parse playback TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as playback configuration.
    pub fn from_file(path: &Path) -> StageResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StageError::Config {
            reason: format!("failed to read playback config '{}': {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "loaded playback config");
        Self::from_toml_str(&contents)
    }

    /// Zero every pause. Transitions still happen one at a time.
    pub fn with_instant_pacing(mut self) -> Self {
        self.pacing = PacingOverrides {
            warmup_ms: Some(0),
            stage_enter_ms: Some(0),
            line_delay_min_ms: Some(0),
            line_delay_max_ms: Some(0),
            stage_gap_ms: Some(0),
        };
        self
    }

    /// Check the values that make sense on their own.
    pub fn validate(&self) -> StageResult<()> {
        if let (Some(min), Some(max)) = (self.pacing.line_delay_min_ms, self.pacing.line_delay_max_ms) {
            if min > max {
                return Err(StageError::Config {
                    reason: format!(
                        "line_delay_min_ms ({}) is greater than line_delay_max_ms ({})",
                        min, max
                    ),
                });
            }
        }
        if let Some(p) = self.outcome.failure_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(StageError::Config {
                    reason: format!("failure_probability {} is outside [0, 1]", p),
                });
            }
        }
        Ok(())
    }

    /// Overlay the `[pacing]` keys onto `base`.
    ///
    /// Returns `StageError::Config` if the merged line-delay range is inverted.
    pub fn pacing_over(&self, base: Pacing) -> StageResult<Pacing> {
        let ms = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };
        let pacing = Pacing {
            warmup: ms(self.pacing.warmup_ms, base.warmup),
            stage_enter: ms(self.pacing.stage_enter_ms, base.stage_enter),
            line_delay_min: ms(self.pacing.line_delay_min_ms, base.line_delay_min),
            line_delay_max: ms(self.pacing.line_delay_max_ms, base.line_delay_max),
            stage_gap: ms(self.pacing.stage_gap_ms, base.stage_gap),
        };
        if pacing.line_delay_min > pacing.line_delay_max {
            return Err(StageError::Config {
                reason: format!(
                    "line delay range inverted: {:?} > {:?}",
                    pacing.line_delay_min, pacing.line_delay_max
                ),
            });
        }
        Ok(pacing)
    }

    /// Overlay the `[outcome]` keys onto `base`.
    pub fn outcome_over(&self, base: OutcomeSettings) -> OutcomeSettings {
        OutcomeSettings {
            mode: self.outcome.mode.unwrap_or(base.mode),
            failure_probability: self
                .outcome
                .failure_probability
                .unwrap_or(base.failure_probability),
            fallback: self.outcome.fallback.unwrap_or(base.fallback),
            seed: self.outcome.seed.or(base.seed),
        }
    }
}

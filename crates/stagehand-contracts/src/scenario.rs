//! Scenario configuration.
//!
//! A scenario names the designated failure point of a run, if any. The
//! outcome policy reads it per step; the controller validates the pairing
//! with its script before playback begins.

use serde::{Deserialize, Serialize};

use crate::{
    error::{StageError, StageResult},
    ids::{ScenarioId, StepId},
    script::StepScript,
};

/// Authored data selecting how a run should end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenario_id: ScenarioId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Deterministic failure point. When absent, the outcome policy falls
    /// back to its module-specific behaviour (random or always-succeed).
    #[serde(default)]
    pub fail_at_step_id: Option<StepId>,
}

impl ScenarioConfig {
    pub fn new(
        scenario_id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            scenario_id: ScenarioId::new(scenario_id),
            label: label.into(),
            description: description.into(),
            fail_at_step_id: None,
        }
    }

    /// The `{}` scenario: no designated failure point.
    pub fn happy_path() -> Self {
        Self::new("happy", "Happy Path", "All stages pass successfully")
    }

    /// Designate `step_id` as the deterministic failure point.
    pub fn failing_at(mut self, step_id: impl Into<String>) -> Self {
        self.fail_at_step_id = Some(StepId::new(step_id));
        self
    }

    /// Reject pairings the controller must never start.
    ///
    /// The designated failure step must exist in `script` and must carry a
    /// failure transcript.
    pub fn validate_against(&self, script: &StepScript) -> StageResult<()> {
        let Some(fail_at) = &self.fail_at_step_id else {
            return Ok(());
        };

        match script.step(fail_at) {
            None => Err(StageError::InvalidScenario {
                reason: format!(
                    "scenario '{}' fails at step '{}', which is not in script '{}'",
                    self.scenario_id,
                    fail_at,
                    script.script_id()
                ),
            }),
            Some(step) if !step.can_fail() => Err(StageError::InvalidScenario {
                reason: format!(
                    "scenario '{}' fails at step '{}', which has no failure log lines",
                    self.scenario_id, fail_at
                ),
            }),
            Some(_) => Ok(()),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::happy_path()
    }
}

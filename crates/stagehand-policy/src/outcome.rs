//! Outcome policies.
//!
//! Decision table, per attempted step:
//!
//! | policy          | scenario designates a step | no designated step       |
//! |-----------------|----------------------------|--------------------------|
//! | `AlwaysSucceed` | succeed                    | succeed                  |
//! | `FailAtStep`    | fail iff it is this step   | succeed                  |
//! | `RandomFailure` | fail with probability p    | fail with probability p  |
//! | `ScenarioPolicy`| fail iff it is this step   | ask the fallback policy  |
//!
//! A step without failure lines never fails under `RandomFailure`; it has no
//! failure transcript to stream.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use stagehand_contracts::{scenario::ScenarioConfig, script::StepDefinition};
use stagehand_core::traits::{OutcomePolicy, RandomSource};

/// Every step succeeds. The Agile and Git branching simulators use this.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSucceed;

impl OutcomePolicy for AlwaysSucceed {
    fn should_fail(&self, _step: &StepDefinition, _scenario: &ScenarioConfig) -> bool {
        false
    }

    fn describe(&self) -> &'static str {
        "always-succeed"
    }
}

/// Fails exactly the step the scenario designates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailAtStep;

impl OutcomePolicy for FailAtStep {
    fn should_fail(&self, step: &StepDefinition, scenario: &ScenarioConfig) -> bool {
        scenario.fail_at_step_id.as_ref() == Some(&step.id)
    }

    fn describe(&self) -> &'static str {
        "fail-at-step"
    }
}

/// Fails each step independently with a fixed probability.
///
/// Randomness is injected so tests can script the draws. The policy is total:
/// a poisoned source lock is recovered and the probability is clamped.
pub struct RandomFailure {
    probability: f64,
    source: Mutex<Box<dyn RandomSource>>,
}

impl RandomFailure {
    pub fn new(probability: f64, source: Box<dyn RandomSource>) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            probability,
            source: Mutex::new(source),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl std::fmt::Debug for RandomFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomFailure")
            .field("probability", &self.probability)
            .finish_non_exhaustive()
    }
}

impl OutcomePolicy for RandomFailure {
    fn should_fail(&self, step: &StepDefinition, _scenario: &ScenarioConfig) -> bool {
        if !step.can_fail() {
            return false;
        }
        let draw = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_f64();
        let failed = draw < self.probability;
        debug!(step_id = %step.id, draw, probability = self.probability, failed, "random outcome");
        failed
    }

    fn describe(&self) -> &'static str {
        "random"
    }
}

/// Deterministic when the scenario names a failure point, otherwise defers
/// to `fallback`.
pub struct ScenarioPolicy {
    fallback: Box<dyn OutcomePolicy>,
}

impl ScenarioPolicy {
    pub fn new(fallback: Box<dyn OutcomePolicy>) -> Self {
        Self { fallback }
    }

    /// The CI/CD behaviour: scripted failures only.
    pub fn deterministic() -> Self {
        Self::new(Box::new(AlwaysSucceed))
    }

    pub fn fallback(&self) -> &dyn OutcomePolicy {
        self.fallback.as_ref()
    }
}

impl std::fmt::Debug for ScenarioPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioPolicy")
            .field("fallback", &self.fallback.describe())
            .finish()
    }
}

impl OutcomePolicy for ScenarioPolicy {
    fn should_fail(&self, step: &StepDefinition, scenario: &ScenarioConfig) -> bool {
        match scenario.fail_at_step_id {
            Some(_) => FailAtStep.should_fail(step, scenario),
            None => self.fallback.should_fail(step, scenario),
        }
    }

    fn describe(&self) -> &'static str {
        "scenario"
    }
}

//! Seams of the playback engine.
//!
//! - `OutcomePolicy`: decides, per step, whether the step fails
//! - `RandomSource`: injected randomness (line jitter, random failures)
//! - `RunObserver`: receives every transition, in mutation order
//!
//! The controller owns one of each and never reaches for ambient globals,
//! so tests substitute deterministic implementations freely.

use std::sync::Arc;

use stagehand_contracts::{
    event::RunEvent,
    scenario::ScenarioConfig,
    script::StepDefinition,
    state::RunState,
};

/// The per-step success/failure decision.
///
/// Implementations must be total: never panic, never block. The controller
/// calls `should_fail` exactly once per attempted step, just after the step
/// is marked running.
pub trait OutcomePolicy: Send + Sync {
    /// Return true if `step` fails under `scenario`.
    fn should_fail(&self, step: &StepDefinition, scenario: &ScenarioConfig) -> bool;

    /// Short name used in logs.
    fn describe(&self) -> &'static str {
        "custom"
    }
}

/// A source of uniformly distributed numbers in `[0, 1)`.
pub trait RandomSource: Send {
    fn next_f64(&mut self) -> f64;
}

/// Receives every state transition the controller applies.
///
/// Called synchronously while the controller holds its state lock, so the
/// order of calls equals the order of mutations. Implementations must be
/// fast and must not call back into the controller.
pub trait RunObserver: Send + Sync {
    fn on_transition(&self, event: &RunEvent, snapshot: &RunState);
}

impl<T: RunObserver + ?Sized> RunObserver for Arc<T> {
    fn on_transition(&self, event: &RunEvent, snapshot: &RunState) {
        (**self).on_transition(event, snapshot)
    }
}

impl<T: OutcomePolicy + ?Sized> OutcomePolicy for Box<T> {
    fn should_fail(&self, step: &StepDefinition, scenario: &ScenarioConfig) -> bool {
        (**self).should_fail(step, scenario)
    }

    fn describe(&self) -> &'static str {
        (**self).describe()
    }
}

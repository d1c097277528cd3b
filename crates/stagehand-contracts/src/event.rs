//! Transition events.
//!
//! Every mutation the controller applies to `RunState` is announced as one
//! `RunEvent`, delivered to observers together with the post-mutation
//! snapshot and in mutation order.

use serde::{Deserialize, Serialize};

use crate::{
    ids::{RunId, ScenarioId, StepId},
    state::{RunPhase, StepStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEvent {
    /// A new run began; all steps are pending and the log is empty.
    RunStarted {
        run_id: RunId,
        scenario_id: ScenarioId,
        step_count: usize,
    },

    /// The step at `index` became the single running step.
    StepStarted { index: usize, step_id: StepId },

    /// One line was appended to the log. `step_id` is `None` for the
    /// completion marker lines.
    LogAppended { step_id: Option<StepId>, line: String },

    /// A step reached a terminal status.
    StepFinished {
        step_id: StepId,
        status: StepStatus,
        duration_secs: f64,
    },

    /// The run reached a terminal phase.
    RunFinished { phase: RunPhase },

    /// State was restored to idle.
    RunReset,
}

impl RunEvent {
    /// Short discriminant used in logs and journal displays.
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "run_started",
            RunEvent::StepStarted { .. } => "step_started",
            RunEvent::LogAppended { .. } => "log_appended",
            RunEvent::StepFinished { .. } => "step_finished",
            RunEvent::RunFinished { .. } => "run_finished",
            RunEvent::RunReset => "run_reset",
        }
    }
}

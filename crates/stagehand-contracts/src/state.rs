//! Run phases, step statuses, and the `RunState` snapshot.
//!
//! `RunState` is what presentation adapters render. The run controller is
//! its only writer; everyone else receives an `Arc<RunState>` snapshot that
//! is never mutated after it has been published.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    ids::{RunId, ScenarioId, StepId},
    script::StepScript,
};

/// Lifecycle of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Success,
    Failed,
}

impl RunPhase {
    /// True for `Success` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Success | RunPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Success => "success",
            RunPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl StepStatus {
    /// True for `Success` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Failed)
    }

    /// Whether a step may move from `self` to `next` within one run.
    ///
    /// Statuses only move forward: pending → running → success | failed.
    /// Staying put is always allowed.
    pub fn can_advance_to(self, next: StepStatus) -> bool {
        use StepStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Running) | (Running, Success) | (Running, Failed)
            )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The observable progress of a run.
///
/// Invariants maintained by the controller:
/// - at most one step is `Running` at any instant;
/// - every step before `active_step_index` is `Success`;
/// - once `phase` is terminal, no status changes until the next reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// The run these values belong to. `None` while idle.
    pub run_id: Option<RunId>,
    /// The scenario being played. `None` while idle.
    pub scenario_id: Option<ScenarioId>,
    pub phase: RunPhase,
    /// One entry per script step, in script order.
    pub step_statuses: IndexMap<StepId, StepStatus>,
    /// Index of the step currently running or last attempted; `None` when idle.
    pub active_step_index: Option<usize>,
    /// Append-only within a run; cleared by reset and by a new start.
    pub log_lines: Vec<String>,
    /// Elapsed seconds per finished step, rounded to one decimal.
    pub step_durations: IndexMap<StepId, f64>,
}

impl RunState {
    /// The idle state for `script`: every step pending, nothing logged.
    pub fn idle(script: &StepScript) -> Self {
        Self {
            step_statuses: script.ids().map(|id| (id.clone(), StepStatus::Pending)).collect(),
            ..Self::default()
        }
    }

    /// Number of steps currently `Running`. Never more than one.
    pub fn running_count(&self) -> usize {
        self.step_statuses
            .values()
            .filter(|s| **s == StepStatus::Running)
            .count()
    }

    pub fn status_of(&self, id: &StepId) -> Option<StepStatus> {
        self.step_statuses.get(id).copied()
    }

    /// Status of the step at script position `index`.
    pub fn status_at(&self, index: usize) -> Option<StepStatus> {
        self.step_statuses.get_index(index).map(|(_, s)| *s)
    }

    pub fn duration_of(&self, id: &StepId) -> Option<f64> {
        self.step_durations.get(id).copied()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// True when every step is pending and nothing has been logged.
    pub fn is_clean_idle(&self) -> bool {
        self.phase == RunPhase::Idle
            && self.run_id.is_none()
            && self.active_step_index.is_none()
            && self.log_lines.is_empty()
            && self.step_durations.is_empty()
            && self.step_statuses.values().all(|s| *s == StepStatus::Pending)
    }
}

impl Default for RunState {
    /// The idle state before any script has been mounted.
    fn default() -> Self {
        Self {
            run_id: None,
            scenario_id: None,
            phase: RunPhase::Idle,
            step_statuses: IndexMap::new(),
            active_step_index: None,
            log_lines: Vec::new(),
            step_durations: IndexMap::new(),
        }
    }
}

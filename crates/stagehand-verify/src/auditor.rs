//! Run invariant auditing.
//!
//! `RunAuditor` replays a sequence of published snapshots (usually read back
//! from the journal) and checks the run invariants:
//!
//! | rule id          | checked on            | requirement                                  |
//! |------------------|-----------------------|----------------------------------------------|
//! | `single-running` | each snapshot         | at most one step is running                  |
//! | `prefix-success` | each snapshot         | every step before the active one succeeded   |
//! | `fail-fast`      | each snapshot         | nothing after a failed step left pending     |
//! | `idle-clean`     | each idle snapshot    | all pending, empty log, no durations         |
//! | `forward-only`   | consecutive, same run | statuses move pending → running → terminal   |
//! | `append-only`    | consecutive, same run | the previous log is a prefix of the next     |
//! | `terminal-frozen`| consecutive, same run | nothing changes after a terminal phase       |
//!
//! Snapshots with different run ids belong to different runs; a reset or a
//! new start is a run boundary.

use std::borrow::Borrow;

use tracing::debug;

use stagehand_contracts::{
    state::{RunPhase, RunState, StepStatus},
    verify::{VerificationFailure, VerificationReport},
};
use stagehand_journal::InMemoryJournal;

pub const SINGLE_RUNNING: &str = "single-running";
pub const PREFIX_SUCCESS: &str = "prefix-success";
pub const FAIL_FAST: &str = "fail-fast";
pub const IDLE_CLEAN: &str = "idle-clean";
pub const FORWARD_ONLY: &str = "forward-only";
pub const APPEND_ONLY: &str = "append-only";
pub const TERMINAL_FROZEN: &str = "terminal-frozen";

/// Checks a snapshot history against the run invariants.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunAuditor;

impl RunAuditor {
    pub fn new() -> Self {
        Self
    }

    /// Audit every snapshot the journal recorded.
    pub fn audit_journal(&self, journal: &InMemoryJournal) -> VerificationReport {
        self.audit(&journal.snapshots())
    }

    /// Audit `snapshots`, in publication order. Every violation is reported.
    pub fn audit<S: Borrow<RunState>>(&self, snapshots: &[S]) -> VerificationReport {
        let mut failures = Vec::new();

        for (at, snapshot) in snapshots.iter().enumerate() {
            check_snapshot(at, snapshot.borrow(), &mut failures);
        }
        for (at, pair) in snapshots.windows(2).enumerate() {
            let (prev, next) = (pair[0].borrow(), pair[1].borrow());
            if prev.run_id.is_some() && prev.run_id == next.run_id {
                check_transition(at + 1, prev, next, &mut failures);
            }
        }

        debug!(
            snapshots = snapshots.len(),
            failures = failures.len(),
            "run history audited"
        );
        VerificationReport::from_failures(failures)
    }
}

fn check_snapshot(at: usize, state: &RunState, failures: &mut Vec<VerificationFailure>) {
    let running = state.running_count();
    if running > 1 {
        failures.push(VerificationFailure::new(
            SINGLE_RUNNING,
            format!("snapshot {}: {} steps running at once", at, running),
        ));
    }

    if let Some(active) = state.active_step_index {
        let broken = state
            .step_statuses
            .iter()
            .take(active)
            .find(|(_, status)| **status != StepStatus::Success);
        if let Some((id, status)) = broken {
            failures.push(VerificationFailure::new(
                PREFIX_SUCCESS,
                format!(
                    "snapshot {}: step '{}' is {} before active step {}",
                    at, id, status, active
                ),
            ));
        }
    }

    let failed_at = state
        .step_statuses
        .values()
        .position(|s| *s == StepStatus::Failed);
    if let Some(failed_at) = failed_at {
        let later = state
            .step_statuses
            .iter()
            .skip(failed_at + 1)
            .find(|(_, status)| **status != StepStatus::Pending);
        if let Some((id, status)) = later {
            failures.push(VerificationFailure::new(
                FAIL_FAST,
                format!("snapshot {}: step '{}' is {} after a failed step", at, id, status),
            ));
        }
        if state.phase != RunPhase::Failed {
            failures.push(VerificationFailure::new(
                FAIL_FAST,
                format!("snapshot {}: a step failed but the run is {}", at, state.phase),
            ));
        }
    }

    if state.phase == RunPhase::Idle && !state.is_clean_idle() {
        failures.push(VerificationFailure::new(
            IDLE_CLEAN,
            format!("snapshot {}: idle state carries leftovers of a run", at),
        ));
    }
}

fn check_transition(
    at: usize,
    prev: &RunState,
    next: &RunState,
    failures: &mut Vec<VerificationFailure>,
) {
    if prev.phase.is_terminal() {
        if prev != next {
            failures.push(VerificationFailure::new(
                TERMINAL_FROZEN,
                format!("snapshot {}: run changed after reaching {}", at, prev.phase),
            ));
        }
        return;
    }

    for (id, before) in &prev.step_statuses {
        match next.status_of(id) {
            Some(after) if before.can_advance_to(after) => {}
            Some(after) => failures.push(VerificationFailure::new(
                FORWARD_ONLY,
                format!("snapshot {}: step '{}' moved from {} to {}", at, id, before, after),
            )),
            None => failures.push(VerificationFailure::new(
                FORWARD_ONLY,
                format!("snapshot {}: step '{}' disappeared mid-run", at, id),
            )),
        }
    }

    if !next.log_lines.starts_with(&prev.log_lines) {
        failures.push(VerificationFailure::new(
            APPEND_ONLY,
            format!("snapshot {}: earlier log lines were rewritten or removed", at),
        ));
    }
}

//! # stagehand-contracts
//!
//! Shared types, snapshots, and contracts for the stagehand playback engine.
//!
//! All crates in the workspace import from here. No playback logic lives in
//! this crate, only data definitions, construction-time validation, and
//! error types.

pub mod error;
pub mod event;
pub mod ids;
pub mod scenario;
pub mod script;
pub mod state;
pub mod verify;

pub use error::{StageError, StageResult};
pub use event::RunEvent;
pub use ids::{RunId, ScenarioId, StepId};
pub use scenario::ScenarioConfig;
pub use script::{StepDefinition, StepScript, DEFAULT_COMPLETION_LINES};
pub use state::{RunPhase, RunState, StepStatus};
pub use verify::{VerificationFailure, VerificationReport};

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str) -> StepDefinition {
        StepDefinition::new(id, id.to_uppercase())
            .with_success_lines([format!("{id} ok")])
            .with_failure_lines([format!("{id} broke")])
    }

    fn three_step_script() -> StepScript {
        StepScript::new("demo", "Demo", vec![step("a"), step("b"), step("c")]).unwrap()
    }

    // ── StepScript validation ────────────────────────────────────────────────

    #[test]
    fn script_rejects_empty_step_list() {
        let err = StepScript::new("empty", "Empty", vec![]).unwrap_err();
        match err {
            StageError::InvalidScript { reason } => assert!(reason.contains("no steps")),
            other => panic!("expected InvalidScript, got {:?}", other),
        }
    }

    #[test]
    fn script_rejects_duplicate_ids() {
        let err = StepScript::new("dup", "Dup", vec![step("a"), step("b"), step("a")]).unwrap_err();
        assert!(err.to_string().contains("'a' more than once"), "got: {err}");
    }

    #[test]
    fn script_rejects_blank_ids() {
        let err = StepScript::new("blank", "Blank", vec![step("a"), step("  ")]).unwrap_err();
        assert!(matches!(err, StageError::InvalidScript { .. }));
    }

    #[test]
    fn script_defaults_completion_marker() {
        let script = three_step_script();
        assert_eq!(script.completion_log_lines().len(), 2);
        assert!(script.completion_log_lines()[1].contains("completed successfully"));
        assert_eq!(script.step_count(), 3);
        assert_eq!(script.position(&StepId::from("c")), Some(2));
    }

    /// Deserialization routes through the same checks as `StepScript::new`.
    #[test]
    fn script_deserialization_is_validated() {
        let bad = r#"{ "script_id": "x", "steps": [] }"#;
        assert!(serde_json::from_str::<StepScript>(bad).is_err());

        let good = r#"{
            "script_id": "x",
            "steps": [{ "id": "only", "name": "Only", "success_log_lines": ["done"] }],
            "completion_log_lines": ["fin"]
        }"#;
        let script: StepScript = serde_json::from_str(good).unwrap();
        assert_eq!(script.steps()[0].failure_log_lines.len(), 0);
        assert_eq!(script.completion_log_lines(), ["fin".to_string()]);
    }

    // ── ScenarioConfig pairing ───────────────────────────────────────────────

    #[test]
    fn happy_path_pairs_with_any_script() {
        assert!(ScenarioConfig::happy_path().validate_against(&three_step_script()).is_ok());
    }

    #[test]
    fn scenario_with_unknown_fail_step_is_rejected() {
        let scenario = ScenarioConfig::new("ghost", "Ghost", "").failing_at("zzz");
        match scenario.validate_against(&three_step_script()) {
            Err(StageError::InvalidScenario { reason }) => {
                assert!(reason.contains("zzz"));
                assert!(reason.contains("demo"));
            }
            other => panic!("expected InvalidScenario, got {:?}", other),
        }
    }

    #[test]
    fn scenario_failing_at_step_without_failure_lines_is_rejected() {
        let script = StepScript::new(
            "s",
            "S",
            vec![StepDefinition::new("commit", "Commit").with_success_lines(["ok"]), step("lint")],
        )
        .unwrap();
        let scenario = ScenarioConfig::new("commit-fail", "Commit Fail", "").failing_at("commit");
        let err = scenario.validate_against(&script).unwrap_err();
        assert!(err.to_string().contains("no failure log lines"));

        let lint = ScenarioConfig::new("lint-fail", "Lint Fail", "").failing_at("lint");
        assert!(lint.validate_against(&script).is_ok());
    }

    // ── RunState ─────────────────────────────────────────────────────────────

    #[test]
    fn idle_state_lists_every_step_pending_in_order() {
        let state = RunState::idle(&three_step_script());
        let ids: Vec<&str> = state.step_statuses.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(state.is_clean_idle());
        assert_eq!(state.running_count(), 0);
        assert_eq!(state.active_step_index, None);
    }

    #[test]
    fn step_status_only_moves_forward() {
        use StepStatus::*;
        assert!(Pending.can_advance_to(Running));
        assert!(Running.can_advance_to(Success));
        assert!(Running.can_advance_to(Failed));
        assert!(Success.can_advance_to(Success));
        assert!(!Pending.can_advance_to(Success));
        assert!(!Success.can_advance_to(Running));
        assert!(!Failed.can_advance_to(Pending));
    }

    #[test]
    fn phase_and_status_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&RunPhase::Failed).unwrap(), "\"failed\"");
        assert_eq!(serde_json::to_string(&StepStatus::Running).unwrap(), "\"running\"");
        assert!(RunPhase::Success.is_terminal());
        assert!(!RunPhase::Running.is_terminal());
    }

    #[test]
    fn run_event_kind_tags() {
        let event = RunEvent::StepStarted { index: 1, step_id: StepId::from("lint") };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "step_started");
        assert_eq!(event.kind(), "step_started");
        assert_eq!(RunEvent::RunReset.kind(), "run_reset");
    }

    // ── RunId ────────────────────────────────────────────────────────────────

    #[test]
    fn run_id_new_produces_unique_values() {
        let unique: std::collections::HashSet<RunId> = (0..100).map(|_| RunId::new()).collect();
        assert_eq!(unique.len(), 100);
    }

    // ── Reports and errors ───────────────────────────────────────────────────

    #[test]
    fn report_summary_joins_failures() {
        let report = VerificationReport::from_failures(vec![
            VerificationFailure::new("single-running", "two steps running"),
            VerificationFailure::new("fail-fast", "step ran after failure"),
        ]);
        assert!(!report.passed);
        assert!(report.has_failure("fail-fast"));
        assert_eq!(
            report.summary(),
            "[single-running] two steps running; [fail-fast] step ran after failure"
        );
        assert!(VerificationReport::from_failures(vec![]).passed);
    }

    #[test]
    fn error_display_messages() {
        let err = StageError::Config { reason: "line delay range inverted".to_string() };
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("inverted"));
        assert!(StageError::NoRuntime.to_string().contains("tokio runtime"));
        let err = StageError::Playback { reason: "task panicked".to_string() };
        assert!(err.to_string().contains("playback task failed"));
    }
}

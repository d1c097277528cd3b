//! End-to-end playback: catalog → controller → journal → auditor.
//!
//! All tests run on a paused tokio clock, so the scripted delays elapse
//! instantly and durations are exact.

use std::sync::Arc;
use std::time::Duration;

use stagehand_catalog::{catalog, ModuleId, SimulationModule};
use stagehand_contracts::{
    scenario::ScenarioConfig,
    state::{RunPhase, RunState, StepStatus},
};
use stagehand_core::{RunController, RunOutcome, StartOutcome};
use stagehand_journal::{transcript_digest, InMemoryJournal};
use stagehand_policy::PlaybackConfig;
use stagehand_verify::RunAuditor;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn pipeline_module() -> SimulationModule {
    SimulationModule::load(ModuleId::Cicd).unwrap()
}

/// A controller for `module` with a journal attached.
fn journaled(module: &SimulationModule, seed: Option<u64>) -> (RunController, Arc<InMemoryJournal>) {
    let controller = module.controller(&PlaybackConfig::default(), seed).unwrap();
    let journal = Arc::new(InMemoryJournal::new());
    controller.add_observer(Box::new(Arc::clone(&journal)));
    (controller, journal)
}

async fn play(
    controller: &RunController,
    module: &SimulationModule,
    script: Option<&str>,
    scenario: Option<&str>,
) -> Arc<RunState> {
    let entry = module.script(script).unwrap();
    let scenario = module.scenario(scenario).unwrap().clone();
    let outcome = controller.start(Arc::clone(&entry.script), scenario).unwrap();
    let StartOutcome::Started(handle) = outcome else {
        panic!("controller was unexpectedly busy");
    };
    match handle.wait().await.unwrap() {
        RunOutcome::Completed(state) => state,
        RunOutcome::Cancelled => panic!("run cancelled"),
    }
}

fn statuses(state: &RunState) -> Vec<StepStatus> {
    state.step_statuses.values().copied().collect()
}

// ── Fail-fast ────────────────────────────────────────────────────────────────

/// Lint fails: Commit succeeded, Lint failed, everything after stays pending,
/// and the log ends with Lint's failure transcript.
#[tokio::test(start_paused = true)]
async fn test_lint_failure_halts_pipeline() {
    use StepStatus::*;
    let module = pipeline_module();
    let (controller, journal) = journaled(&module, None);

    let state = play(&controller, &module, None, Some("lint-fail")).await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(statuses(&state), [Success, Failed, Pending, Pending, Pending]);

    let script = &module.script(None).unwrap().script;
    let lint_fail = &script.steps()[1].failure_log_lines;
    assert!(state.log_lines.ends_with(lint_fail));
    let commit_ok = &script.steps()[0].success_log_lines;
    assert_eq!(state.log_lines.len(), commit_ok.len() + lint_fail.len());
    assert!(!state.log_lines.iter().any(|l| l.contains("jest") || l.contains("docker")));

    let report = RunAuditor::new().audit_journal(&journal);
    assert!(report.passed, "{}", report.summary());
}

/// For every failure point k: steps before k succeed, k fails, the rest pend.
#[tokio::test(start_paused = true)]
async fn test_fail_fast_holds_for_every_failure_point() {
    let module = pipeline_module();
    let script = Arc::clone(&module.script(None).unwrap().script);

    for scenario in module.scenarios.iter().filter(|s| s.fail_at_step_id.is_some()) {
        let (controller, journal) = journaled(&module, None);
        let state = play(&controller, &module, None, Some(scenario.scenario_id.as_str())).await;

        let k = script
            .position(scenario.fail_at_step_id.as_ref().unwrap())
            .unwrap();
        for (i, status) in statuses(&state).into_iter().enumerate() {
            let expected = match i.cmp(&k) {
                std::cmp::Ordering::Less => StepStatus::Success,
                std::cmp::Ordering::Equal => StepStatus::Failed,
                std::cmp::Ordering::Greater => StepStatus::Pending,
            };
            assert_eq!(status, expected, "{}: step {}", scenario.scenario_id, i);
        }
        assert_eq!(state.active_step_index, Some(k));
        assert!(RunAuditor::new().audit_journal(&journal).passed);
    }
}

/// Random failure never lands on a step without a failure transcript: with
/// p = 1 the pipeline fails at Lint, the first step that can fail.
#[tokio::test(start_paused = true)]
async fn test_certain_random_failure_skips_steps_that_cannot_fail() {
    use StepStatus::*;
    let module = pipeline_module();
    let config = PlaybackConfig::from_toml_str(
        "[outcome]\nmode = \"random\"\nfailure_probability = 1.0",
    )
    .unwrap();
    let controller = module.controller(&config, Some(5)).unwrap();
    let state = play(&controller, &module, None, None).await;

    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(statuses(&state), [Success, Failed, Pending, Pending, Pending]);

    let script = &module.script(None).unwrap().script;
    let expected: Vec<String> = script.steps()[0]
        .success_log_lines
        .iter()
        .chain(&script.steps()[1].failure_log_lines)
        .cloned()
        .collect();
    assert_eq!(state.log_lines, expected);
}

// ── Happy path ───────────────────────────────────────────────────────────────

/// Every module's default script completes when nothing is designated to fail.
#[tokio::test(start_paused = true)]
async fn test_happy_path_completes_in_every_deterministic_module() {
    for module in catalog().unwrap() {
        if module.id == ModuleId::Actions {
            continue;
        }
        for entry in &module.scripts {
            let (controller, journal) = journaled(&module, None);
            let state = play(&controller, &module, Some(entry.id()), None).await;

            assert_eq!(state.phase, RunPhase::Success, "{}/{}", module.id, entry.id());
            assert!(state.step_statuses.values().all(|s| *s == StepStatus::Success));
            let marker = entry.script.completion_log_lines().last().unwrap();
            assert_eq!(state.log_lines.last(), Some(marker));

            let report = RunAuditor::new().audit_journal(&journal);
            assert!(report.passed, "{}/{}: {}", module.id, entry.id(), report.summary());
            assert!(journal.verify_integrity());
        }
    }
}

// ── Log ordering ─────────────────────────────────────────────────────────────

/// The final log is each step's selected transcript in order, then the
/// completion lines, identical across runs.
#[tokio::test(start_paused = true)]
async fn test_log_is_concatenation_of_step_transcripts() {
    let module = pipeline_module();
    let script = Arc::clone(&module.script(None).unwrap().script);

    let (first, _) = journaled(&module, Some(1));
    let (second, _) = journaled(&module, Some(1));
    let a = play(&first, &module, None, Some("deploy-fail")).await;
    let b = play(&second, &module, None, Some("deploy-fail")).await;

    let expected: Vec<String> = script
        .steps()
        .iter()
        .map(|s| s.log_lines(s.id.as_str() == "deploy"))
        .flat_map(|lines| lines.iter().cloned())
        .collect();
    assert_eq!(a.log_lines, expected);
    assert_eq!(transcript_digest(&a.log_lines), transcript_digest(&b.log_lines));
    assert_eq!(a.step_durations, b.step_durations);
}

/// With a seed, the random GitHub Actions outcomes replay exactly.
#[tokio::test(start_paused = true)]
async fn test_seeded_random_workflow_is_reproducible() {
    let module = SimulationModule::load(ModuleId::Actions).unwrap();
    let config = PlaybackConfig::from_toml_str("[outcome]\nfailure_probability = 0.5").unwrap();

    let mut transcripts = Vec::new();
    for _ in 0..2 {
        let controller = module.controller(&config, Some(2024)).unwrap();
        let state = play(&controller, &module, Some("basic"), None).await;
        transcripts.push((state.phase, state.log_lines.clone()));
    }
    assert_eq!(transcripts[0], transcripts[1]);
}

// ── Reset and reentrancy ─────────────────────────────────────────────────────

/// A start while running changes nothing; a mid-run reset leaves a clean
/// idle state and the journal still audits clean.
#[tokio::test(start_paused = true)]
async fn test_busy_start_and_mid_run_reset() {
    let module = pipeline_module();
    let (controller, journal) = journaled(&module, Some(3));
    let entry = module.script(None).unwrap();

    let first = controller
        .start(Arc::clone(&entry.script), ScenarioConfig::happy_path())
        .unwrap();
    let StartOutcome::Started(handle) = first else {
        panic!("first start must succeed");
    };

    tokio::time::sleep(Duration::from_secs(2)).await;
    let before = controller.snapshot();
    let second = controller
        .start(Arc::clone(&entry.script), module.scenario(Some("test-fail")).unwrap().clone())
        .unwrap();
    assert!(matches!(second, StartOutcome::AlreadyRunning));
    assert!(Arc::ptr_eq(&before, &controller.snapshot()));

    controller.reset();
    assert!(matches!(handle.wait().await.unwrap(), RunOutcome::Cancelled));
    assert!(controller.snapshot().is_clean_idle());

    let entries = journal.len();
    controller.reset();
    assert_eq!(journal.len(), entries, "second reset must publish nothing");

    let report = RunAuditor::new().audit_journal(&journal);
    assert!(report.passed, "{}", report.summary());
}

/// After a completed run, the next start begins from a clean slate.
#[tokio::test(start_paused = true)]
async fn test_restart_after_failure_starts_fresh() {
    let module = pipeline_module();
    let (controller, journal) = journaled(&module, None);

    let failed = play(&controller, &module, None, Some("test-fail")).await;
    let happy = play(&controller, &module, None, Some("happy")).await;

    assert_ne!(failed.run_id, happy.run_id);
    assert_eq!(happy.phase, RunPhase::Success);
    assert!(!happy.log_lines.iter().any(|l| l.contains("test_null_handling")));
    assert!(RunAuditor::new().audit_journal(&journal).passed);
}

// ── Pacing ───────────────────────────────────────────────────────────────────

/// Per-step durations reflect the configured line pauses.
#[tokio::test(start_paused = true)]
async fn test_durations_follow_configured_pacing() {
    let module = pipeline_module();
    let config = PlaybackConfig::from_toml_str(
        "[pacing]\nline_delay_min_ms = 100\nline_delay_max_ms = 100",
    )
    .unwrap();
    let controller = module.controller(&config, None).unwrap();
    let state = play(&controller, &module, None, None).await;

    let script = &module.script(None).unwrap().script;
    for step in script.steps() {
        let expected = (step.success_log_lines.len() as f64 * 0.1 * 10.0).round() / 10.0;
        assert_eq!(state.duration_of(&step.id), Some(expected), "{}", step.id);
    }
}

//! The run controller: the single writer of `RunState`.
//!
//! Playback model per step:
//!
//!   enter pause → mark running → decide outcome → stream lines → finish
//!
//! Failure is fail-fast: the first failed step ends the run and every later
//! step keeps its `pending` status. The only suspension points are the
//! scripted pauses, each raced against the run's cancellation token.
//!
//! `pause()` closes a gate that playback checks after each scripted pause,
//! so the state freezes between transitions until `resume()`. Cancellation
//! always wins over a closed gate.
//!
//! Every write goes through `Shared::commit`, which refuses the write unless
//! the run's generation is still current. `reset()`, `mount()` and dropping
//! the controller bump the generation under the same lock, so a stale task
//! can never touch the state of the run that replaced it.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{runtime::Handle, sync::watch, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use stagehand_contracts::{
    error::{StageError, StageResult},
    event::RunEvent,
    ids::RunId,
    scenario::ScenarioConfig,
    script::StepScript,
    state::{RunPhase, RunState, StepStatus},
};

use crate::{
    pacing::Pacing,
    traits::{OutcomePolicy, RandomSource, RunObserver},
};

/// What `start()` did.
#[derive(Debug)]
pub enum StartOutcome {
    /// A new run is playing.
    Started(RunHandle),
    /// A run was already playing; nothing changed.
    AlreadyRunning,
}

impl StartOutcome {
    /// The handle of the new run, if one was started.
    pub fn into_handle(self) -> Option<RunHandle> {
        match self {
            StartOutcome::Started(handle) => Some(handle),
            StartOutcome::AlreadyRunning => None,
        }
    }
}

/// How a playback task ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The run reached `Success` or `Failed`; this is its terminal snapshot.
    Completed(Arc<RunState>),
    /// The run was reset, remounted, or its controller dropped.
    Cancelled,
}

/// Handle to one spawned playback task.
#[derive(Debug)]
pub struct RunHandle {
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Wait for the playback task to end.
    ///
    /// # Errors
    ///
    /// Returns `StageError::Playback` if the task panicked.
    pub async fn wait(self) -> StageResult<RunOutcome> {
        self.join.await.map_err(|e| StageError::Playback {
            reason: e.to_string(),
        })
    }
}

// ── Shared state ─────────────────────────────────────────────────────────────

struct Inner {
    state: Arc<RunState>,
    /// Bumped by every start, reset, mount and drop.
    generation: u64,
    script: Option<Arc<StepScript>>,
    cancel: Option<CancellationToken>,
    observers: Vec<Box<dyn RunObserver>>,
}

struct Shared {
    inner: Mutex<Inner>,
    publisher: watch::Sender<Arc<RunState>>,
    /// `true` while playback is held.
    paused: watch::Sender<bool>,
    policy: Box<dyn OutcomePolicy>,
    random: Mutex<Box<dyn RandomSource>>,
    pacing: Pacing,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the state, publish it, and notify observers. Caller holds the lock.
    fn install(&self, inner: &mut Inner, next: RunState, events: &[RunEvent]) -> Arc<RunState> {
        let next = Arc::new(next);
        inner.state = Arc::clone(&next);
        self.publisher.send_replace(Arc::clone(&next));
        for event in events {
            for observer in &inner.observers {
                observer.on_transition(event, &next);
            }
        }
        next
    }

    /// Apply one transition on behalf of the run with `generation`.
    ///
    /// Returns `None`, without touching anything, if that run is stale.
    fn commit<F>(&self, generation: u64, mutate: F) -> Option<Arc<RunState>>
    where
        F: FnOnce(&mut RunState) -> Vec<RunEvent>,
    {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "stale run write refused");
            return None;
        }
        let mut next = RunState::clone(&inner.state);
        let events = mutate(&mut next);
        Some(self.install(&mut inner, next, &events))
    }

    fn next_line_delay(&self) -> Duration {
        if !self.pacing.has_line_jitter() {
            return self.pacing.line_delay_min;
        }
        let unit = self
            .random
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_f64();
        self.pacing.line_delay(unit)
    }

    /// Cancel the in-flight run, if any, and invalidate its generation.
    /// The next run starts unpaused.
    fn retire_current(&self, inner: &mut Inner) {
        if let Some(token) = inner.cancel.take() {
            token.cancel();
        }
        inner.generation += 1;
        self.paused.send_replace(false);
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

/// Drives playback of step scripts against an outcome policy.
///
/// Construct one controller per mounted view. It owns the only mutable
/// `RunState`; presentation code reads `Arc<RunState>` snapshots through
/// `snapshot()` or `subscribe()`. Dropping the controller cancels any run
/// in flight.
pub struct RunController {
    shared: Arc<Shared>,
}

impl RunController {
    /// Create an idle controller with no script mounted.
    pub fn new(
        policy: Box<dyn OutcomePolicy>,
        pacing: Pacing,
        random: Box<dyn RandomSource>,
    ) -> Self {
        let initial = Arc::new(RunState::default());
        let (publisher, _) = watch::channel(Arc::clone(&initial));
        let (paused, _) = watch::channel(false);
        let inner = Inner {
            state: initial,
            generation: 0,
            script: None,
            cancel: None,
            observers: Vec::new(),
        };
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                publisher,
                paused,
                policy,
                random: Mutex::new(random),
                pacing,
            }),
        }
    }

    /// Builder-style `add_observer`.
    pub fn with_observer(self, observer: Box<dyn RunObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Register an observer for all subsequent transitions.
    pub fn add_observer(&self, observer: Box<dyn RunObserver>) {
        self.shared.lock().observers.push(observer);
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<RunState> {
        Arc::clone(&self.shared.lock().state)
    }

    /// A receiver that sees every published snapshot (latest-value semantics).
    pub fn subscribe(&self) -> watch::Receiver<Arc<RunState>> {
        self.shared.publisher.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().state.phase == RunPhase::Running
    }

    /// True while a playing run is held by `pause()`.
    pub fn is_paused(&self) -> bool {
        *self.shared.paused.borrow() && self.is_running()
    }

    /// Hold the playing run at its next transition.
    ///
    /// The current pause runs out, then nothing is published until `resume()`.
    /// Returns false, changing nothing, when no run is playing.
    pub fn pause(&self) -> bool {
        let inner = self.shared.lock();
        if inner.state.phase != RunPhase::Running {
            return false;
        }
        if !self.shared.paused.send_replace(true) {
            info!(run_id = ?inner.state.run_id, "run paused");
        }
        true
    }

    /// Let a paused run continue from where it stopped.
    ///
    /// Returns true if the run was paused.
    pub fn resume(&self) -> bool {
        let was_paused = self.shared.paused.send_replace(false);
        if was_paused {
            info!("run resumed");
        }
        was_paused
    }

    /// The script of the current or last run.
    pub fn script(&self) -> Option<Arc<StepScript>> {
        self.shared.lock().script.clone()
    }

    /// Make `script` the active script and show its idle state.
    ///
    /// Any run in flight is cancelled first, exactly as `reset()` does.
    pub fn mount(&self, script: Arc<StepScript>) {
        let mut inner = self.shared.lock();
        self.shared.retire_current(&mut inner);
        let idle = RunState::idle(&script);
        info!(script_id = %script.script_id(), steps = script.step_count(), "script mounted");
        inner.script = Some(script);
        if *inner.state != idle {
            self.shared.install(&mut inner, idle, &[RunEvent::RunReset]);
        }
    }

    /// Start playing `script` under `scenario`.
    ///
    /// Configuration errors are returned before any state changes. A call
    /// while a run is already playing is ignored and reported as
    /// `StartOutcome::AlreadyRunning`.
    ///
    /// # Errors
    ///
    /// - `StageError::InvalidScenario` if the scenario's failure point is not
    ///   a failable step of `script`
    /// - `StageError::NoRuntime` if called outside a tokio runtime
    pub fn start(
        &self,
        script: Arc<StepScript>,
        scenario: ScenarioConfig,
    ) -> StageResult<StartOutcome> {
        scenario.validate_against(&script)?;
        let runtime = Handle::try_current().map_err(|_| StageError::NoRuntime)?;

        let mut inner = self.shared.lock();
        if inner.state.phase == RunPhase::Running {
            warn!(
                scenario_id = %scenario.scenario_id,
                run_id = ?inner.state.run_id,
                "start ignored: a run is already playing"
            );
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.shared.retire_current(&mut inner);
        let generation = inner.generation;
        let token = CancellationToken::new();
        inner.cancel = Some(token.clone());
        inner.script = Some(Arc::clone(&script));

        let run_id = RunId::new();
        let fresh = RunState {
            run_id: Some(run_id),
            scenario_id: Some(scenario.scenario_id.clone()),
            phase: RunPhase::Running,
            ..RunState::idle(&script)
        };
        let started = RunEvent::RunStarted {
            run_id,
            scenario_id: scenario.scenario_id.clone(),
            step_count: script.step_count(),
        };
        self.shared.install(&mut inner, fresh, &[started]);
        drop(inner);

        info!(
            run_id = %run_id,
            script_id = %script.script_id(),
            scenario_id = %scenario.scenario_id,
            policy = self.shared.policy.describe(),
            "run started"
        );

        let join = runtime.spawn(playback(
            Arc::clone(&self.shared),
            script,
            scenario,
            generation,
            token,
        ));
        Ok(StartOutcome::Started(RunHandle { join }))
    }

    /// Restore the idle state, cancelling any run in flight.
    ///
    /// Safe at any time. Resetting an already clean idle state publishes
    /// nothing, so the snapshot keeps its identity.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        let was_running = inner.state.phase == RunPhase::Running;
        self.shared.retire_current(&mut inner);

        let idle = match &inner.script {
            Some(script) => RunState::idle(script),
            None => RunState::default(),
        };
        if *inner.state == idle {
            debug!("reset on clean idle state; nothing to do");
            return;
        }
        self.shared.install(&mut inner, idle, &[RunEvent::RunReset]);
        info!(cancelled_run = was_running, "run state reset");
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        self.shared.retire_current(&mut inner);
    }
}

// ── Playback task ────────────────────────────────────────────────────────────

/// Wait `delay`, then wait while `gate` is closed.
///
/// Returns the time spent behind the gate, or `None` once `token` fires.
async fn hold(
    token: &CancellationToken,
    gate: &mut watch::Receiver<bool>,
    delay: Duration,
) -> Option<Duration> {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        if token.is_cancelled() {
            return None;
        }
    } else {
        tokio::select! {
            biased;
            () = token.cancelled() => return None,
            () = tokio::time::sleep(delay) => {}
        }
    }

    if !*gate.borrow() {
        return Some(Duration::ZERO);
    }
    let held_at = Instant::now();
    let resumed = tokio::select! {
        biased;
        () = token.cancelled() => false,
        resumed = async { gate.wait_for(|paused| !*paused).await.is_ok() } => resumed,
    };
    resumed.then(|| held_at.elapsed())
}

fn round_tenths(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10.0).round() / 10.0
}

async fn playback(
    shared: Arc<Shared>,
    script: Arc<StepScript>,
    scenario: ScenarioConfig,
    generation: u64,
    token: CancellationToken,
) -> RunOutcome {
    let pacing = shared.pacing;
    let mut gate = shared.paused.subscribe();

    if hold(&token, &mut gate, pacing.warmup).await.is_none() {
        return RunOutcome::Cancelled;
    }

    for (index, step) in script.steps().iter().enumerate() {
        if hold(&token, &mut gate, pacing.stage_enter).await.is_none() {
            return RunOutcome::Cancelled;
        }

        // ── Mark running ─────────────────────────────────────────────────────
        let marked = shared.commit(generation, |state| {
            state.active_step_index = Some(index);
            state.step_statuses.insert(step.id.clone(), StepStatus::Running);
            state.phase = RunPhase::Running;
            vec![RunEvent::StepStarted {
                index,
                step_id: step.id.clone(),
            }]
        });
        if marked.is_none() {
            return RunOutcome::Cancelled;
        }
        let started_at = Instant::now();
        let mut held = Duration::ZERO;

        // ── Decide and stream ────────────────────────────────────────────────
        let failed = shared.policy.should_fail(step, &scenario);
        debug!(step_id = %step.id, index, failed, "step outcome decided");

        for line in step.log_lines(failed) {
            let appended = shared.commit(generation, |state| {
                state.log_lines.push(line.clone());
                vec![RunEvent::LogAppended {
                    step_id: Some(step.id.clone()),
                    line: line.clone(),
                }]
            });
            if appended.is_none() {
                return RunOutcome::Cancelled;
            }
            match hold(&token, &mut gate, shared.next_line_delay()).await {
                Some(paused_for) => held += paused_for,
                None => return RunOutcome::Cancelled,
            }
        }

        let duration_secs = round_tenths(started_at.elapsed().saturating_sub(held));

        // ── Finish ───────────────────────────────────────────────────────────
        if failed {
            let Some(terminal) = shared.commit(generation, |state| {
                state.step_statuses.insert(step.id.clone(), StepStatus::Failed);
                state.step_durations.insert(step.id.clone(), duration_secs);
                state.phase = RunPhase::Failed;
                vec![
                    RunEvent::StepFinished {
                        step_id: step.id.clone(),
                        status: StepStatus::Failed,
                        duration_secs,
                    },
                    RunEvent::RunFinished { phase: RunPhase::Failed },
                ]
            }) else {
                return RunOutcome::Cancelled;
            };
            info!(
                step_id = %step.id,
                scenario_id = %scenario.scenario_id,
                duration_secs,
                "step failed; run halted"
            );
            return RunOutcome::Completed(terminal);
        }

        let finished = shared.commit(generation, |state| {
            state.step_statuses.insert(step.id.clone(), StepStatus::Success);
            state.step_durations.insert(step.id.clone(), duration_secs);
            vec![RunEvent::StepFinished {
                step_id: step.id.clone(),
                status: StepStatus::Success,
                duration_secs,
            }]
        });
        if finished.is_none() {
            return RunOutcome::Cancelled;
        }
        debug!(step_id = %step.id, duration_secs, "step succeeded");

        if hold(&token, &mut gate, pacing.stage_gap).await.is_none() {
            return RunOutcome::Cancelled;
        }
    }

    // ── Natural completion ───────────────────────────────────────────────────
    let Some(terminal) = shared.commit(generation, |state| {
        let mut events: Vec<RunEvent> = script
            .completion_log_lines()
            .iter()
            .map(|line| {
                state.log_lines.push(line.clone());
                RunEvent::LogAppended {
                    step_id: None,
                    line: line.clone(),
                }
            })
            .collect();
        state.phase = RunPhase::Success;
        events.push(RunEvent::RunFinished { phase: RunPhase::Success });
        events
    }) else {
        return RunOutcome::Cancelled;
    };

    info!(scenario_id = %scenario.scenario_id, "run completed successfully");
    RunOutcome::Completed(terminal)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use stagehand_contracts::{
        error::StageError,
        event::RunEvent,
        scenario::ScenarioConfig,
        script::{StepDefinition, StepScript},
        state::{RunPhase, RunState, StepStatus},
    };

    use crate::pacing::Pacing;
    use crate::traits::{OutcomePolicy, RandomSource, RunObserver};

    use super::{RunController, RunOutcome, StartOutcome};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// Fails exactly at the scenario's designated step.
    struct FailAt;

    impl OutcomePolicy for FailAt {
        fn should_fail(&self, step: &StepDefinition, scenario: &ScenarioConfig) -> bool {
            scenario.fail_at_step_id.as_ref() == Some(&step.id)
        }
    }

    /// Always returns the same number.
    struct FixedSource(f64);

    impl RandomSource for FixedSource {
        fn next_f64(&mut self) -> f64 {
            self.0
        }
    }

    /// Records every (event, snapshot) pair.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(RunEvent, RunState)>>,
    }

    impl RunObserver for Recorder {
        fn on_transition(&self, event: &RunEvent, snapshot: &RunState) {
            self.seen.lock().unwrap().push((event.clone(), snapshot.clone()));
        }
    }

    impl Recorder {
        fn len(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn snapshots(&self) -> Vec<RunState> {
            self.seen.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
        }
    }

    fn pipeline() -> Arc<StepScript> {
        let steps = ["commit", "lint", "test", "build", "deploy"]
            .into_iter()
            .map(|id| {
                StepDefinition::new(id, id)
                    .with_success_lines([format!("{id}: start"), format!("{id}: ok")])
                    .with_failure_lines([format!("{id}: start"), format!("{id}: FAILED")])
            })
            .collect();
        Arc::new(StepScript::new("pipeline", "Pipeline", steps).unwrap())
    }

    fn controller() -> (RunController, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let controller = RunController::new(
            Box::new(FailAt),
            Pacing::default().with_fixed_line_delay(Duration::from_millis(200)),
            Box::new(FixedSource(0.5)),
        )
        .with_observer(Box::new(Arc::clone(&recorder)));
        (controller, recorder)
    }

    async fn run_to_end(controller: &RunController, scenario: ScenarioConfig) -> Arc<RunState> {
        let handle = controller
            .start(pipeline(), scenario)
            .unwrap()
            .into_handle()
            .expect("run should start");
        match handle.wait().await.unwrap() {
            RunOutcome::Completed(state) => state,
            RunOutcome::Cancelled => panic!("run was cancelled unexpectedly"),
        }
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    /// Happy path: every step succeeds and the completion marker is appended.
    #[tokio::test(start_paused = true)]
    async fn test_happy_path_completes_every_step() {
        let (controller, _) = controller();
        let state = run_to_end(&controller, ScenarioConfig::happy_path()).await;

        assert_eq!(state.phase, RunPhase::Success);
        assert!(state.step_statuses.values().all(|s| *s == StepStatus::Success));
        assert_eq!(state.active_step_index, Some(4));
        assert_eq!(state.step_durations.len(), 5);
        assert_eq!(
            state.log_lines.last().map(String::as_str),
            Some("🎉 Pipeline completed successfully!")
        );
        assert_eq!(controller.snapshot(), state);
    }

    /// Fail-fast: steps before the failure succeed, later steps stay pending.
    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_leaves_later_steps_pending() {
        let (controller, _) = controller();
        let scenario = ScenarioConfig::new("lint-fail", "Fail Linting", "").failing_at("lint");
        let state = run_to_end(&controller, scenario).await;

        let statuses: Vec<StepStatus> = state.step_statuses.values().copied().collect();
        assert_eq!(
            statuses,
            [
                StepStatus::Success,
                StepStatus::Failed,
                StepStatus::Pending,
                StepStatus::Pending,
                StepStatus::Pending
            ]
        );
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.active_step_index, Some(1));
        assert_eq!(
            state.log_lines,
            ["commit: start", "commit: ok", "lint: start", "lint: FAILED"]
        );
        assert_eq!(state.step_durations.len(), 2);
    }

    /// Every intermediate snapshot has at most one running step.
    #[tokio::test(start_paused = true)]
    async fn test_single_active_step_in_every_snapshot() {
        let (controller, recorder) = controller();
        let scenario = ScenarioConfig::new("deploy-fail", "Deploy Crash", "").failing_at("deploy");
        run_to_end(&controller, scenario).await;

        let snapshots = recorder.snapshots();
        assert!(snapshots.len() > 10);
        for snapshot in &snapshots {
            assert!(snapshot.running_count() <= 1, "two steps running: {:?}", snapshot);
        }
    }

    /// Durations are measured on the tokio clock: two lines at 200 ms each.
    #[tokio::test(start_paused = true)]
    async fn test_step_durations_follow_line_pauses() {
        let (controller, _) = controller();
        let state = run_to_end(&controller, ScenarioConfig::happy_path()).await;
        for duration in state.step_durations.values() {
            assert_eq!(*duration, 0.4);
        }
    }

    /// A second start while running leaves the published snapshot untouched.
    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_a_no_op() {
        let (controller, recorder) = controller();
        let handle = controller
            .start(pipeline(), ScenarioConfig::happy_path())
            .unwrap()
            .into_handle()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(650)).await;
        let before = controller.snapshot();
        let events_before = recorder.len();

        let second = controller
            .start(pipeline(), ScenarioConfig::new("lint-fail", "x", "").failing_at("lint"))
            .unwrap();
        assert!(matches!(second, StartOutcome::AlreadyRunning));
        assert!(Arc::ptr_eq(&before, &controller.snapshot()));
        assert_eq!(recorder.len(), events_before);

        // The first run is unaffected and still succeeds.
        match handle.wait().await.unwrap() {
            RunOutcome::Completed(state) => assert_eq!(state.phase, RunPhase::Success),
            RunOutcome::Cancelled => panic!("first run must not be cancelled"),
        }
    }

    /// Reset mid-run cancels the task; nothing is written afterwards.
    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_run_cancels_playback() {
        let (controller, recorder) = controller();
        let handle = controller
            .start(pipeline(), ScenarioConfig::happy_path())
            .unwrap()
            .into_handle()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(controller.is_running());

        controller.reset();
        let after_reset = recorder.len();
        assert!(matches!(handle.wait().await.unwrap(), RunOutcome::Cancelled));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(recorder.len(), after_reset, "stale run wrote after reset");

        let state = controller.snapshot();
        assert!(state.is_clean_idle());
        assert_eq!(state.step_statuses.len(), 5);
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.last().map(|(e, _)| e.clone()), Some(RunEvent::RunReset));
    }

    /// Reset twice equals reset once; reset on idle publishes nothing.
    #[tokio::test(start_paused = true)]
    async fn test_reset_is_idempotent() {
        let (controller, recorder) = controller();
        run_to_end(&controller, ScenarioConfig::happy_path()).await;

        controller.reset();
        let once = controller.snapshot();
        let events = recorder.len();
        controller.reset();
        let twice = controller.snapshot();

        assert!(Arc::ptr_eq(&once, &twice));
        assert_eq!(recorder.len(), events);
        assert_eq!(*once, RunState::idle(&pipeline()));
    }

    /// An unknown failure point is rejected before any state change.
    #[tokio::test(start_paused = true)]
    async fn test_invalid_scenario_rejected_before_mutation() {
        let (controller, recorder) = controller();
        let before = controller.snapshot();
        let scenario = ScenarioConfig::new("ghost", "Ghost", "").failing_at("package");

        match controller.start(pipeline(), scenario) {
            Err(StageError::InvalidScenario { reason }) => assert!(reason.contains("package")),
            other => panic!("expected InvalidScenario, got {:?}", other),
        }
        assert!(Arc::ptr_eq(&before, &controller.snapshot()));
        assert_eq!(recorder.len(), 0);
    }

    /// Outside a runtime, start reports NoRuntime and changes nothing.
    #[test]
    fn test_start_without_runtime_is_rejected() {
        let (controller, _) = controller();
        let result = controller.start(pipeline(), ScenarioConfig::happy_path());
        assert!(matches!(result, Err(StageError::NoRuntime)));
        assert!(controller.snapshot().step_statuses.is_empty());
    }

    /// Identical inputs produce identical transcripts.
    #[tokio::test(start_paused = true)]
    async fn test_log_transcript_is_reproducible() {
        let scenario = ScenarioConfig::new("test-fail", "Fail Unit Tests", "").failing_at("test");
        let (first, _) = controller();
        let (second, _) = controller();
        let a = run_to_end(&first, scenario.clone()).await;
        let b = run_to_end(&second, scenario).await;

        assert_eq!(a.log_lines, b.log_lines);
        assert_eq!(a.step_statuses, b.step_statuses);
        assert_eq!(a.step_durations, b.step_durations);
    }

    /// Dropping the controller is the unmount path: the task stops.
    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_run() {
        let (controller, recorder) = controller();
        let handle = controller
            .start(pipeline(), ScenarioConfig::happy_path())
            .unwrap()
            .into_handle()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;

        drop(controller);
        assert!(matches!(handle.wait().await.unwrap(), RunOutcome::Cancelled));
        let count = recorder.len();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.len(), count);
    }

    /// Subscribers observe the terminal snapshot.
    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_terminal_phase() {
        let (controller, _) = controller();
        let mut rx = controller.subscribe();
        let _handle = controller.start(pipeline(), ScenarioConfig::happy_path()).unwrap();

        let terminal = rx
            .wait_for(|state| state.phase.is_terminal())
            .await
            .expect("sender lives as long as the controller");
        assert_eq!(terminal.phase, RunPhase::Success);
    }

    /// A paused run publishes nothing, then continues from the same step.
    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_and_resume_continues_same_step() {
        let (controller, recorder) = controller();
        let handle = controller
            .start(pipeline(), ScenarioConfig::happy_path())
            .unwrap()
            .into_handle()
            .unwrap();

        // Commit is running with one line streamed.
        tokio::time::sleep(Duration::from_millis(650)).await;
        assert!(controller.pause());
        assert!(controller.is_paused());
        let frozen = controller.snapshot();
        let events_before = recorder.len();
        assert_eq!(frozen.log_lines, ["commit: start"]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(Arc::ptr_eq(&frozen, &controller.snapshot()));
        assert_eq!(recorder.len(), events_before);

        assert!(controller.resume());
        assert!(!controller.is_paused());
        let state = match handle.wait().await.unwrap() {
            RunOutcome::Completed(state) => state,
            RunOutcome::Cancelled => panic!("resumed run must complete"),
        };

        let next_event = recorder.seen.lock().unwrap()[events_before].0.clone();
        assert_eq!(
            next_event,
            RunEvent::LogAppended {
                step_id: Some("commit".into()),
                line: "commit: ok".to_string(),
            }
        );
        assert_eq!(state.phase, RunPhase::Success);
        assert!(state.log_lines.starts_with(&frozen.log_lines));
        // Time spent paused is not counted against the step.
        for duration in state.step_durations.values() {
            assert_eq!(*duration, 0.4);
        }
    }

    /// Reset cancels a paused run; the next run starts unpaused.
    #[tokio::test(start_paused = true)]
    async fn test_reset_wins_over_pause() {
        let (controller, _) = controller();
        let handle = controller
            .start(pipeline(), ScenarioConfig::happy_path())
            .unwrap()
            .into_handle()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(650)).await;
        assert!(controller.pause());

        controller.reset();
        assert!(matches!(handle.wait().await.unwrap(), RunOutcome::Cancelled));
        assert!(controller.snapshot().is_clean_idle());
        assert!(!controller.is_paused());

        let state = run_to_end(&controller, ScenarioConfig::happy_path()).await;
        assert_eq!(state.phase, RunPhase::Success);
    }

    /// Pause and resume without a playing run change nothing.
    #[test]
    fn test_pause_without_run_is_rejected() {
        let (controller, recorder) = controller();
        assert!(!controller.pause());
        assert!(!controller.resume());
        assert!(!controller.is_paused());
        assert_eq!(recorder.len(), 0);
    }

    /// Mounting shows the pending nodes of a script before any run.
    #[tokio::test(start_paused = true)]
    async fn test_mount_publishes_idle_state_for_script() {
        let (controller, recorder) = controller();
        controller.mount(pipeline());
        let state = controller.snapshot();
        assert_eq!(state.step_statuses.len(), 5);
        assert!(state.is_clean_idle());
        assert_eq!(recorder.len(), 1);

        // Reset right after mount is a no-op.
        controller.reset();
        assert_eq!(recorder.len(), 1);
    }
}

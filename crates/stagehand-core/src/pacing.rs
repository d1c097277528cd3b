//! Playback timing.
//!
//! The pauses give the streaming-console effect. They carry no correctness
//! meaning: `Pacing::instant()` plays the same transitions with no delay.

use std::time::Duration;

/// The scripted delays of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Once, before the first step.
    pub warmup: Duration,
    /// Before each step is marked running.
    pub stage_enter: Duration,
    /// Lower bound of the pause after each appended log line.
    pub line_delay_min: Duration,
    /// Upper bound of the pause after each appended log line.
    pub line_delay_max: Duration,
    /// After each successful step.
    pub stage_gap: Duration,
}

impl Pacing {
    /// No delays at all. Transitions still happen one at a time.
    pub const fn instant() -> Self {
        Self {
            warmup: Duration::ZERO,
            stage_enter: Duration::ZERO,
            line_delay_min: Duration::ZERO,
            line_delay_max: Duration::ZERO,
            stage_gap: Duration::ZERO,
        }
    }

    /// A fixed pause per step and no per-line pause.
    pub const fn per_step(step: Duration) -> Self {
        Self {
            warmup: Duration::ZERO,
            stage_enter: step,
            line_delay_min: Duration::ZERO,
            line_delay_max: Duration::ZERO,
            stage_gap: Duration::ZERO,
        }
    }

    /// Same pauses, but every line waits exactly `delay`.
    pub const fn with_fixed_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay_min = delay;
        self.line_delay_max = delay;
        self
    }

    /// True when the line delay needs a random draw.
    pub fn has_line_jitter(&self) -> bool {
        self.line_delay_max > self.line_delay_min
    }

    /// Pick a line delay from `unit`, a number in `[0, 1)`.
    ///
    /// Out-of-range inputs are clamped so a misbehaving source can never
    /// produce a delay outside the configured bounds.
    pub fn line_delay(&self, unit: f64) -> Duration {
        if !self.has_line_jitter() {
            return self.line_delay_min;
        }
        let unit = if unit.is_finite() { unit.clamp(0.0, 1.0) } else { 0.0 };
        let span = self.line_delay_max - self.line_delay_min;
        self.line_delay_min + span.mul_f64(unit)
    }
}

impl Default for Pacing {
    /// The CI/CD simulator timing: 100 ms warm-up, 400 ms stage entry,
    /// 150–250 ms per line, 300 ms between stages.
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(100),
            stage_enter: Duration::from_millis(400),
            line_delay_min: Duration::from_millis(150),
            line_delay_max: Duration::from_millis(250),
            stage_gap: Duration::from_millis(300),
        }
    }
}

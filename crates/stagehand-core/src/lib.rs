//! # stagehand-core
//!
//! The deterministic, cancellable playback runtime for step scripts.
//!
//! This crate provides:
//! - The engine seams (`OutcomePolicy`, `RandomSource`, `RunObserver`)
//! - `Pacing`, the scripted delays of a run
//! - The `RunController` that plays a script step by step and publishes
//!   immutable `RunState` snapshots
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagehand_core::{RunController, Pacing, StartOutcome};
//!
//! let controller = RunController::new(policy, Pacing::default(), random);
//! if let StartOutcome::Started(handle) = controller.start(script, scenario)? {
//!     let outcome = handle.wait().await?;
//! }
//! ```

pub mod controller;
pub mod pacing;
pub mod traits;

pub use controller::{RunController, RunHandle, RunOutcome, StartOutcome};
pub use pacing::Pacing;
pub use traits::{OutcomePolicy, RandomSource, RunObserver};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Pacing;

    // ── Pacing ───────────────────────────────────────────────────────────────

    #[test]
    fn default_pacing_matches_pipeline_timing() {
        let pacing = Pacing::default();
        assert_eq!(pacing.warmup, Duration::from_millis(100));
        assert_eq!(pacing.stage_enter, Duration::from_millis(400));
        assert_eq!(pacing.stage_gap, Duration::from_millis(300));
        assert!(pacing.has_line_jitter());
    }

    #[test]
    fn line_delay_interpolates_within_bounds() {
        let pacing = Pacing::default();
        assert_eq!(pacing.line_delay(0.0), Duration::from_millis(150));
        assert_eq!(pacing.line_delay(0.5), Duration::from_millis(200));
        assert_eq!(pacing.line_delay(1.0), Duration::from_millis(250));
    }

    /// A misbehaving random source cannot push a delay out of range.
    #[test]
    fn line_delay_clamps_bad_input() {
        let pacing = Pacing::default();
        assert_eq!(pacing.line_delay(-3.0), Duration::from_millis(150));
        assert_eq!(pacing.line_delay(7.0), Duration::from_millis(250));
        assert_eq!(pacing.line_delay(f64::NAN), Duration::from_millis(150));
    }

    #[test]
    fn instant_and_per_step_have_no_jitter() {
        assert!(!Pacing::instant().has_line_jitter());
        let step = Pacing::per_step(Duration::from_millis(1500));
        assert_eq!(step.stage_enter, Duration::from_millis(1500));
        assert_eq!(step.line_delay(0.9), Duration::ZERO);
    }
}

//! # stagehand-policy
//!
//! Outcome policies and TOML playback configuration for stagehand.
//!
//! ## Overview
//!
//! This crate provides the [`OutcomePolicy`](stagehand_core::traits::OutcomePolicy)
//! implementations the simulators use ([`AlwaysSucceed`], [`FailAtStep`],
//! [`RandomFailure`], [`ScenarioPolicy`]), the production random source
//! [`FastRandSource`], and [`PlaybackConfig`], which overrides a module's
//! pacing and outcome settings from a TOML file.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use stagehand_policy::{OutcomeSettings, PlaybackConfig};
//!
//! let config = PlaybackConfig::from_file(Path::new("playback.toml"))?;
//! let settings = config.outcome_over(OutcomeSettings::scripted());
//! let policy = settings.build_policy();
//! ```

pub mod config;
pub mod outcome;
pub mod random;

pub use config::{
    Fallback, OutcomeMode, OutcomeOverrides, OutcomeSettings, PacingOverrides, PlaybackConfig,
    DEFAULT_FAILURE_PROBABILITY,
};
pub use outcome::{AlwaysSucceed, FailAtStep, RandomFailure, ScenarioPolicy};
pub use random::FastRandSource;

// ── Tests ─────────────────────────────────────────────────────────────────────

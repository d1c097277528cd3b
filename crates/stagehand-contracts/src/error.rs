//! Error types for the stagehand playback engine.
//!
//! Only configuration problems and infrastructure faults are errors. A
//! simulated pipeline failure is a normal outcome and is reported through
//! `RunState::phase`, never through `StageError`.

use thiserror::Error;

/// The unified error type for the stagehand crates.
#[derive(Debug, Error)]
pub enum StageError {
    /// The step script itself is malformed (empty, blank or duplicate ids).
    #[error("invalid step script: {reason}")]
    InvalidScript { reason: String },

    /// The scenario cannot be played against the given script.
    #[error("invalid scenario: {reason}")]
    InvalidScenario { reason: String },

    /// A configuration file or value is missing or out of range.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// `start()` was called outside of a tokio runtime.
    #[error("no tokio runtime available to drive playback")]
    NoRuntime,

    /// The playback task ended abnormally (panic or join failure).
    #[error("playback task failed: {reason}")]
    Playback { reason: String },

    /// A journal entry could not be hashed or serialized.
    #[error("journal error: {reason}")]
    Journal { reason: String },

    /// An authored script document failed structural or semantic validation.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },
}

/// Convenience alias used throughout the stagehand crates.
pub type StageResult<T> = Result<T, StageError>;

//! # stagehand-verify
//!
//! Verification for stagehand scripts and runs.
//!
//! This crate provides:
//!
//! 1. [`ScriptLoader`], which loads authored TOML script documents and checks
//!    them structurally (JSON Schema via the `jsonschema` crate) and
//!    semantically (unique ids, valid scenario pairings).
//! 2. [`RunAuditor`], which replays a run's snapshot history and reports
//!    every violated run invariant.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use stagehand_verify::{RunAuditor, ScriptLoader};
//!
//! let document = ScriptLoader::from_file(Path::new("pipeline.toml"))?;
//! // ... play document.script with a controller and a journal ...
//! let report = RunAuditor::new().audit_journal(&journal);
//! assert!(report.passed, "{}", report.summary());
//! ```

pub mod auditor;
pub mod loader;

pub use auditor::RunAuditor;
pub use loader::{ScriptDocument, ScriptLoader};

// ── Tests ─────────────────────────────────────────────────────────────────────

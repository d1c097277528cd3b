//! Authored script documents.
//!
//! `ScriptLoader` turns a TOML document into a validated `StepScript` plus
//! its scenarios. Loading runs in two phases:
//!
//! 1. **Structural**: the document, converted to JSON, is checked against the
//!    embedded `script.schema.json` with the `jsonschema` crate.
//! 2. **Semantic**: unique step and scenario ids, and every scenario's
//!    failure point must be a step of the script that carries failure lines.
//!
//! All failures are collected before answering.
//!
//! ```toml
//! [script]
//! id = "cicd"
//! title = "CI/CD Pipeline"
//!
//! [[steps]]
//! id = "lint"
//! name = "Lint"
//! success_log_lines = ["$ npm run lint", "✅ No linting errors"]
//! failure_log_lines = ["$ npm run lint", "❌ 2 errors"]
//!
//! [[scenarios]]
//! id = "lint-fail"
//! label = "Fail Linting"
//! fail_at_step_id = "lint"
//! ```

use std::{collections::HashSet, path::Path, sync::Arc};

use serde::Deserialize;
use tracing::{debug, warn};

use stagehand_contracts::{
    error::{StageError, StageResult},
    scenario::ScenarioConfig,
    script::{StepDefinition, StepScript},
    verify::{VerificationFailure, VerificationReport},
};

const SCRIPT_SCHEMA: &str = include_str!("../schemas/script.schema.json");

/// A loaded, fully validated script document.
#[derive(Debug, Clone)]
pub struct ScriptDocument {
    pub script: Arc<StepScript>,
    pub scenarios: Vec<ScenarioConfig>,
}

impl ScriptDocument {
    pub fn scenario(&self, id: &str) -> Option<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.scenario_id.as_str() == id)
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    script: RawHeader,
    steps: Vec<StepDefinition>,
    #[serde(default)]
    scenarios: Vec<RawScenario>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    id: String,
    title: String,
    completion_log_lines: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    id: String,
    label: String,
    #[serde(default)]
    description: String,
    fail_at_step_id: Option<String>,
}

impl RawScenario {
    fn to_config(&self) -> ScenarioConfig {
        let config = ScenarioConfig::new(&self.id, &self.label, &self.description);
        match &self.fail_at_step_id {
            Some(step) => config.failing_at(step),
            None => config,
        }
    }
}

/// Loads and checks authored script documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLoader;

impl ScriptLoader {
    /// Parse and fully validate a TOML script document.
    ///
    /// Returns `StageError::Config` if the text is not TOML and
    /// `StageError::SchemaValidation` listing every failed rule otherwise.
    pub fn from_toml_str(s: &str) -> StageResult<ScriptDocument> {
        let (report, document) = Self::inspect(s)?;
        match document {
            Some(document) if report.passed => Ok(document),
            _ => Err(StageError::SchemaValidation {
                reason: report.summary(),
            }),
        }
    }

    /// Read the file at `path` and load it as a script document.
    pub fn from_file(path: &Path) -> StageResult<ScriptDocument> {
        let contents = std::fs::read_to_string(path).map_err(|e| StageError::Config {
            reason: format!("failed to read script file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Run every check and return the report, without failing on violations.
    pub fn check_toml_str(s: &str) -> StageResult<VerificationReport> {
        Self::inspect(s).map(|(report, _)| report)
    }

    fn inspect(s: &str) -> StageResult<(VerificationReport, Option<ScriptDocument>)> {
        let value: serde_json::Value = toml::from_str(s).map_err(|e| StageError::Config {
            reason: format!("failed to parse script TOML: {}", e),
        })?;

        // ── Phase 1: JSON Schema structural validation ────────────────────────
        let mut failures = structural_failures(&value);
        if !failures.is_empty() {
            return Ok((VerificationReport::from_failures(failures), None));
        }

        let raw: RawDocument = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                failures.push(VerificationFailure::new("json-schema", e.to_string()));
                return Ok((VerificationReport::from_failures(failures), None));
            }
        };

        // ── Phase 2: Semantic checks ─────────────────────────────────────────
        let mut seen = HashSet::new();
        for step in &raw.steps {
            if step.id.as_str().trim().is_empty() {
                failures.push(VerificationFailure::new("step-id", "step id is blank"));
            } else if !seen.insert(step.id.as_str()) {
                failures.push(VerificationFailure::new(
                    "unique-step-id",
                    format!("step id '{}' appears more than once", step.id),
                ));
            }
        }

        let mut seen_scenarios = HashSet::new();
        for scenario in &raw.scenarios {
            if !seen_scenarios.insert(scenario.id.as_str()) {
                failures.push(VerificationFailure::new(
                    "unique-scenario-id",
                    format!("scenario id '{}' appears more than once", scenario.id),
                ));
            }
        }

        if !failures.is_empty() {
            return Ok((VerificationReport::from_failures(failures), None));
        }

        let mut script = StepScript::new(&raw.script.id, &raw.script.title, raw.steps)?;
        if let Some(lines) = raw.script.completion_log_lines {
            script = script.with_completion_lines(lines);
        }

        let scenarios: Vec<ScenarioConfig> = raw.scenarios.iter().map(RawScenario::to_config).collect();
        for scenario in &scenarios {
            if let Err(e) = scenario.validate_against(&script) {
                failures.push(VerificationFailure::new("scenario-pairing", e.to_string()));
            }
        }

        debug!(
            script_id = %script.script_id(),
            steps = script.step_count(),
            scenarios = scenarios.len(),
            failures = failures.len(),
            "script document checked"
        );

        let report = VerificationReport::from_failures(failures);
        let document = ScriptDocument {
            script: Arc::new(script),
            scenarios,
        };
        Ok((report, Some(document)))
    }
}

fn structural_failures(document: &serde_json::Value) -> Vec<VerificationFailure> {
    let schema: serde_json::Value = match serde_json::from_str(SCRIPT_SCHEMA) {
        Ok(schema) => schema,
        Err(e) => {
            return vec![VerificationFailure::new(
                "json-schema",
                format!("embedded schema is not JSON: {e}"),
            )]
        }
    };
    match jsonschema::validator_for(&schema) {
        Ok(validator) => validator
            .iter_errors(document)
            .map(|error| {
                let message = format!("JSON Schema violation at {}: {}", error.instance_path, error);
                warn!(%message, "structural validation failure");
                VerificationFailure::new("json-schema", message)
            })
            .collect(),
        Err(e) => vec![VerificationFailure::new(
            "json-schema",
            format!("invalid JSON Schema document: {e}"),
        )],
    }
}

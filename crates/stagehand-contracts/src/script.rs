//! Step definitions and validated step scripts.
//!
//! A `StepScript` is authored data: an ordered, immutable list of steps. The
//! only way to obtain one is through `StepScript::new` (or deserialization,
//! which routes through the same checks), so every script the controller sees
//! has at least one step and unique, non-blank step ids.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{StageError, StageResult},
    ids::StepId,
};

/// Lines appended after the last step when a run completes without failure.
pub const DEFAULT_COMPLETION_LINES: [&str; 2] = ["", "🎉 Pipeline completed successfully!"];

/// One stage of a scripted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique token within the owning script.
    pub id: StepId,
    /// Human label shown on the stage node.
    pub name: String,
    /// Replayed in order when the step succeeds.
    #[serde(default)]
    pub success_log_lines: Vec<String>,
    /// Replayed in order when the step fails. Empty means the step can never
    /// be a designated failure point.
    #[serde(default)]
    pub failure_log_lines: Vec<String>,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: StepId::new(id),
            name: name.into(),
            success_log_lines: Vec::new(),
            failure_log_lines: Vec::new(),
        }
    }

    pub fn with_success_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success_log_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_failure_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure_log_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// The log source selected for the given outcome.
    pub fn log_lines(&self, failed: bool) -> &[String] {
        if failed {
            &self.failure_log_lines
        } else {
            &self.success_log_lines
        }
    }

    /// True if this step carries a failure transcript and may be designated
    /// as a scenario's failure point.
    pub fn can_fail(&self) -> bool {
        !self.failure_log_lines.is_empty()
    }
}

/// An ordered, validated sequence of steps driving one simulated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStepScript", into = "RawStepScript")]
pub struct StepScript {
    script_id: String,
    title: String,
    steps: Vec<StepDefinition>,
    completion_log_lines: Vec<String>,
}

impl StepScript {
    /// Build a script, rejecting empty step lists and blank or duplicate ids.
    ///
    /// The completion marker defaults to `DEFAULT_COMPLETION_LINES`.
    pub fn new(
        script_id: impl Into<String>,
        title: impl Into<String>,
        steps: Vec<StepDefinition>,
    ) -> StageResult<Self> {
        let script_id = script_id.into();
        validate_steps(&script_id, &steps)?;
        Ok(Self {
            script_id,
            title: title.into(),
            steps,
            completion_log_lines: DEFAULT_COMPLETION_LINES.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the lines appended on natural completion.
    pub fn with_completion_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.completion_log_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn script_id(&self) -> &str {
        &self.script_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn completion_log_lines(&self) -> &[String] {
        &self.completion_log_lines
    }

    /// Number of steps. Always at least one.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Look up a step by id.
    pub fn step(&self, id: &StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Script position of the step with the given id.
    pub fn position(&self, id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == id)
    }

    /// Step ids in script order.
    pub fn ids(&self) -> impl Iterator<Item = &StepId> {
        self.steps.iter().map(|s| &s.id)
    }
}

/// Check the script-level invariants: non-empty, non-blank ids, unique ids.
fn validate_steps(script_id: &str, steps: &[StepDefinition]) -> StageResult<()> {
    if steps.is_empty() {
        return Err(StageError::InvalidScript {
            reason: format!("script '{script_id}' has no steps"),
        });
    }

    let mut seen = HashSet::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        if step.id.as_str().trim().is_empty() {
            return Err(StageError::InvalidScript {
                reason: format!("script '{script_id}' step #{index} has a blank id"),
            });
        }
        if !seen.insert(step.id.as_str()) {
            return Err(StageError::InvalidScript {
                reason: format!("script '{script_id}' declares step id '{}' more than once", step.id),
            });
        }
    }

    Ok(())
}

/// Wire shape of a `StepScript`; validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStepScript {
    script_id: String,
    #[serde(default)]
    title: String,
    steps: Vec<StepDefinition>,
    #[serde(default)]
    completion_log_lines: Option<Vec<String>>,
}

impl TryFrom<RawStepScript> for StepScript {
    type Error = StageError;

    fn try_from(raw: RawStepScript) -> StageResult<Self> {
        let script = StepScript::new(raw.script_id, raw.title, raw.steps)?;
        Ok(match raw.completion_log_lines {
            Some(lines) => script.with_completion_lines(lines),
            None => script,
        })
    }
}

impl From<StepScript> for RawStepScript {
    fn from(script: StepScript) -> Self {
        Self {
            script_id: script.script_id,
            title: script.title,
            steps: script.steps,
            completion_log_lines: Some(script.completion_log_lines),
        }
    }
}

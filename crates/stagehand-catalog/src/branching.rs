//! The Git branching strategy simulator.
//!
//! Plays a branch history one commit at a time. Every step logs the action
//! and the commit it places; nothing ever fails.

use std::time::Duration;

use stagehand_contracts::{
    error::StageResult,
    script::{StepDefinition, StepScript},
};
use stagehand_core::pacing::Pacing;

/// One animation step: what happens, on which branch, with which message.
#[derive(Debug, Clone, Copy)]
pub struct BranchStep {
    pub action: &'static str,
    pub branch: &'static str,
    pub message: &'static str,
}

const fn step(action: &'static str, branch: &'static str, message: &'static str) -> BranchStep {
    BranchStep { action, branch, message }
}

#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub id: &'static str,
    pub name: &'static str,
    pub branches: &'static [&'static str],
    pub steps: &'static [BranchStep],
}

pub const GITFLOW: Strategy = Strategy {
    id: "gitflow",
    name: "Git Flow",
    branches: &["main", "develop", "feature/auth", "release/v1.0", "hotfix/bug"],
    steps: &[
        step("Initial commit on main", "main", "Initial"),
        step("Create develop branch", "develop", "Branch develop"),
        step("Start feature/auth", "feature/auth", "Start auth"),
        step("Commit to feature", "feature/auth", "Add login"),
        step("Commit to feature", "feature/auth", "Add signup"),
        step("Merge feature → develop", "develop", "Merge auth"),
        step("Create release branch", "release/v1.0", "v1.0-rc"),
        step("Merge release → main", "main", "v1.0"),
        step("Merge release → develop", "develop", "Sync v1.0"),
        step("Hotfix on main", "hotfix/bug", "Fix crash"),
        step("Merge hotfix everywhere", "main", "v1.0.1"),
    ],
};

pub const TRUNK: Strategy = Strategy {
    id: "trunk",
    name: "Trunk-Based",
    branches: &["main", "feature (short-lived)"],
    steps: &[
        step("Initial commit", "main", "Initial"),
        step("Dev A: Pull → Commit → Push", "main", "Add feature A"),
        step("Dev B: Pull → Commit → Push", "main", "Add feature B"),
        step("Dev C: Short branch → PR", "feature (short-lived)", "Work on C"),
        step("Merge C → main (same day)", "main", "Merge C"),
        step("Dev A: Another commit", "main", "Update docs"),
        step("Deploy to production", "main", "Deploy v1.1"),
    ],
};

pub const STRATEGIES: &[Strategy] = &[GITFLOW, TRUNK];

impl Strategy {
    /// Step ids are the commit messages in kebab case, which are unique
    /// within a strategy even where the action text repeats.
    pub fn script(&self) -> StageResult<StepScript> {
        let steps = self
            .steps
            .iter()
            .map(|s| {
                StepDefinition::new(crate::actions::slug(s.message), s.action)
                    .with_success_lines([format!("> {}", s.action), format!("  ● {}: {}", s.branch, s.message)])
            })
            .collect();
        Ok(StepScript::new(self.id, self.name, steps)?
            .with_completion_lines([format!("✓ {} history complete", self.name)]))
    }
}

/// One commit every 1.5 s: a 900 ms lead-in, then 300 ms after each of
/// the step's two lines.
pub fn pacing() -> Pacing {
    Pacing::per_step(Duration::from_millis(900)).with_fixed_line_delay(Duration::from_millis(300))
}

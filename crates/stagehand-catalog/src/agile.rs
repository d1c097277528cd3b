//! The Agile-to-production lifecycle simulator.
//!
//! Follows one Jira ticket from sprint planning to a tagged release. The
//! branch name, commit message and version are derived from the ticket.

use std::time::Duration;

use stagehand_contracts::{
    error::StageResult,
    script::{StepDefinition, StepScript},
};
use stagehand_core::pacing::Pacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub jira_id: &'static str,
    pub title: &'static str,
    /// Pull request number shown in the review step.
    pub pr_number: u32,
}

pub const TICKETS: &[Ticket] = &[
    Ticket {
        jira_id: "PROJ-101",
        title: "Create User Authentication API",
        pr_number: 142,
    },
    Ticket {
        jira_id: "PROJ-102",
        title: "Add Payment Gateway Integration",
        pr_number: 157,
    },
    Ticket {
        jira_id: "PROJ-103",
        title: "Implement Email Notifications",
        pr_number: 163,
    },
];

/// Typed out line by line in the coding step.
pub const CODE_SNIPPET: &[&str] = &[
    "export async function authenticate(req, res) {",
    "  const { username, password } = req.body;",
    "  const user = await User.findOne({ username });",
    "  if (!user) return res.status(401).json({ error: \"Invalid credentials\" });",
    "  const isValid = await bcrypt.compare(password, user.password);",
    "  if (isValid) {",
    "    const token = jwt.sign({ id: user.id }, process.env.JWT_SECRET);",
    "    return res.json({ token });",
    "  }",
    "}",
];

const SLUG_LEN: usize = 20;

impl Ticket {
    /// `feature/<jira id>-<title slug>`, slug cut to 20 characters.
    pub fn branch_name(&self) -> String {
        let slug = self
            .title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let slug: String = slug.chars().take(SLUG_LEN).collect();
        format!("feature/{}-{}", self.jira_id.to_lowercase(), slug)
    }

    /// Conventional commit subject linked to the ticket.
    pub fn commit_message(&self) -> String {
        format!("feat: {} [{}]", self.title, self.jira_id)
    }

    /// Version shipped by the `release`-th deployment.
    pub fn release_version(release: usize) -> String {
        format!("v1.{}.0", release)
    }

    /// The lifecycle of this ticket as the `release`-th deployment.
    pub fn script(&self, release: usize) -> StageResult<StepScript> {
        let id = self.jira_id;
        let branch = self.branch_name();
        let version = Self::release_version(release);
        let pr = self.pr_number;

        let coding = std::iter::once(format!("> code . # on {branch}"))
            .chain(CODE_SNIPPET.iter().map(|line| line.to_string()));

        let steps = vec![
            StepDefinition::new("planning", "Sprint Planning").with_success_lines([
                format!("📋 {id}: {}", self.title),
                format!("  {id} moved: Backlog → In Progress"),
            ]),
            StepDefinition::new("branch", "Create Branch").with_success_lines([
                format!("> git checkout -b {branch}"),
                format!("✓ Switched to a new branch '{branch}'"),
            ]),
            StepDefinition::new("coding", "Write Code").with_success_lines(coding),
            StepDefinition::new("commit", "Commit").with_success_lines([
                format!("> git commit -m \"{}\"", self.commit_message()),
                format!("✓ Commit linked to {id}"),
            ]),
            StepDefinition::new("pull-request", "Pull Request").with_success_lines([
                format!("> gh pr create --base main --head {branch}"),
                format!("✓ PR #{pr} opened, {id} moved: In Progress → Review"),
            ]),
            StepDefinition::new("pipeline", "CI/CD Pipeline").with_success_lines([
                "> Running checks: lint, test, build".to_string(),
                format!("✓ All checks passed on PR #{pr}"),
            ]),
            StepDefinition::new("release", "Release").with_success_lines([
                format!("> git tag {version}"),
                format!("🚀 {version} deployed, {id} moved: Review → Done"),
            ]),
        ];

        Ok(StepScript::new(id.to_lowercase(), self.title, steps)?
            .with_completion_lines(["".to_string(), format!("🎉 {id} shipped in {version}")]))
    }
}

/// 1.5 s per stage, 300 ms per typed line.
pub fn pacing() -> Pacing {
    Pacing::per_step(Duration::from_millis(1500)).with_fixed_line_delay(Duration::from_millis(300))
}

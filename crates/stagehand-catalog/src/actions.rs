//! The GitHub Actions workflow simulator.
//!
//! Each workflow stage logs `[NAME] Starting...` and then either
//! `[NAME] ✅ Completed` or `[NAME] ❌ Failed`. There are no designated
//! failure points: every stage fails independently with a small probability.

use std::time::Duration;

use stagehand_contracts::{
    error::StageResult,
    script::{StepDefinition, StepScript},
};
use stagehand_core::pacing::Pacing;

pub const COMPLETION_LINE: &str = "[WORKFLOW] 🎉 All jobs completed successfully";

/// Chance that any one stage fails.
pub const FAILURE_PROBABILITY: f64 = 0.05;

/// A workflow file and the stages the simulator plays for it.
#[derive(Debug, Clone, Copy)]
pub struct Workflow {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub yaml: &'static str,
    pub stages: &'static [&'static str],
}

pub const WORKFLOWS: &[Workflow] = &[
    Workflow {
        id: "basic",
        name: "Basic CI/CD",
        description: "Simple Node.js build and test",
        yaml: "\
name: CI Pipeline
on:
  push:
    branches: [main]
  pull_request:
    branches: [main]

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - uses: actions/setup-node@v3
        with:
          node-version: '18'
      - run: npm install
      - run: npm test
      - run: npm run build",
        stages: &["Checkout", "Setup Node", "Install", "Test", "Build"],
    },
    Workflow {
        id: "snowflake",
        name: "Snowflake Deploy",
        description: "Deploy to Snowflake with secrets",
        yaml: "\
name: Snowflake Deployment
on:
  push:
    branches: [main]

jobs:
  deploy:
    runs-on: self-hosted  # Inside firewall
    environment: production
    steps:
      - uses: actions/checkout@v3
      - name: Deploy to Snowflake
        env:
          SNOWFLAKE_ACCOUNT: ${{ secrets.SF_ACCOUNT }}
          SNOWFLAKE_PRIVATE_KEY: ${{ secrets.SF_KEY }}
        run: |
          snowsql -f migrations/*.sql",
        stages: &["Checkout", "Deploy SQL", "Verify"],
    },
    Workflow {
        id: "matrix",
        name: "Matrix Strategy",
        description: "Test across multiple versions",
        yaml: "\
name: Matrix Build
on: [push]

jobs:
  test:
    runs-on: ubuntu-latest
    strategy:
      matrix:
        node: [16, 18, 20]
        os: [ubuntu, windows]
    steps:
      - uses: actions/checkout@v3
      - uses: actions/setup-node@v3
        with:
          node-version: ${{ matrix.node }}
      - run: npm test",
        stages: &["Checkout", "Setup Matrix", "Test 9x Combinations"],
    },
];

/// `"Setup Node"` → `"setup-node"`.
pub(crate) fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

impl Workflow {
    pub fn script(&self) -> StageResult<StepScript> {
        let steps = self
            .stages
            .iter()
            .map(|stage| {
                let tag = stage.to_uppercase();
                StepDefinition::new(slug(stage), *stage)
                    .with_success_lines([format!("[{tag}] Starting..."), format!("[{tag}] ✅ Completed")])
                    .with_failure_lines([format!("[{tag}] Starting..."), format!("[{tag}] ❌ Failed")])
            })
            .collect();
        Ok(StepScript::new(self.id, self.name, steps)?.with_completion_lines([COMPLETION_LINE]))
    }
}

/// 1.5 s per stage, split evenly between its two lines.
pub fn pacing() -> Pacing {
    Pacing::per_step(Duration::ZERO).with_fixed_line_delay(Duration::from_millis(750))
}

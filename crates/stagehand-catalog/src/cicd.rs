//! The CI/CD pipeline simulator.
//!
//! Five stages with scripted transcripts. Commit and Build carry no failure
//! transcript, so only Lint, Unit Test and Deploy can be failure points.

use stagehand_contracts::{
    error::StageResult,
    scenario::ScenarioConfig,
    script::{StepDefinition, StepScript},
};
use stagehand_core::pacing::Pacing;

pub const SCRIPT_ID: &str = "pipeline";

const COMMIT_OK: &[&str] = &[
    "> git checkout main",
    "> git pull origin main",
    "✓ Branch up to date",
    "> Triggering workflow: deploy.yml",
    "✓ Workflow started on runner ubuntu-latest",
];

const LINT_OK: &[&str] = &[
    "> npm run lint",
    "> eslint src/**/*.ts --fix",
    "✓ No ESLint warnings",
    "> sqlfluff lint dags/*.sql",
    "✓ SQL linting passed (0 violations)",
    "✓ All checks passed",
];

const LINT_FAIL: &[&str] = &[
    "> npm run lint",
    "> eslint src/**/*.ts",
    "✗ ERROR: Unexpected console statement (no-console)",
    "✗ ERROR: Missing semicolon (semi)",
    "✗ 2 problems (2 errors, 0 warnings)",
    "❌ Lint stage FAILED - Pipeline halted",
];

const TEST_OK: &[&str] = &[
    "> npm run test",
    "> jest --coverage --ci",
    "  PASS  src/utils/transform.test.ts",
    "  PASS  src/dags/etl_pipeline.test.py",
    "  PASS  src/models/snowflake.test.sql",
    "✓ Tests: 47 passed, 0 failed",
    "✓ Coverage: 89.3% (threshold: 80%)",
];

const TEST_FAIL: &[&str] = &[
    "> npm run test",
    "> jest --coverage --ci",
    "  PASS  src/utils/transform.test.ts",
    "  FAIL  src/dags/etl_pipeline.test.py",
    "    ✗ test_null_handling",
    "    Expected: 0, Received: NULL",
    "✗ Tests: 46 passed, 1 failed",
    "❌ Test stage FAILED - Pipeline halted",
];

const BUILD_OK: &[&str] = &[
    "> npm run build",
    "> tsc --noEmit",
    "✓ TypeScript compilation successful",
    "> docker build -t app:$SHA .",
    "  Step 1/8: FROM node:18-alpine",
    "  Step 8/8: HEALTHCHECK --interval=30s",
    "✓ Image built: app:a3f2b1c (234MB)",
    "> docker push registry.io/app:a3f2b1c",
    "✓ Image pushed to registry",
];

const DEPLOY_OK: &[&str] = &[
    "> kubectl apply -f k8s/deployment.yaml",
    "  deployment.apps/etl-service configured",
    "> kubectl rollout status deployment/etl-service",
    "  Waiting for rollout to finish: 1/3 replicas",
    "  Waiting for rollout to finish: 2/3 replicas",
    "✓ deployment \"etl-service\" successfully rolled out",
    "> Running smoke tests...",
    "✓ Health check: 200 OK",
    "✓ Deployed to PRODUCTION 🚀",
];

const DEPLOY_FAIL: &[&str] = &[
    "> kubectl apply -f k8s/deployment.yaml",
    "  deployment.apps/etl-service configured",
    "> kubectl rollout status deployment/etl-service",
    "  Waiting for rollout to finish: 1/3 replicas",
    "  error: deployment exceeded deadline",
    "✗ ERROR 500: Container crashed - OOMKilled",
    "> kubectl rollback deployment/etl-service",
    "  rollback completed",
    "❌ Deploy stage FAILED - Rolled back",
];

/// Commit → Lint → Unit Test → Build → Deploy.
pub fn pipeline_script() -> StageResult<StepScript> {
    let stage = |id: &str, name: &str, ok: &[&str], fail: &[&str]| {
        StepDefinition::new(id, name)
            .with_success_lines(ok.iter().copied())
            .with_failure_lines(fail.iter().copied())
    };
    StepScript::new(
        SCRIPT_ID,
        "CI/CD Pipeline",
        vec![
            stage("commit", "Commit", COMMIT_OK, &[]),
            stage("lint", "Lint", LINT_OK, LINT_FAIL),
            stage("test", "Unit Test", TEST_OK, TEST_FAIL),
            stage("build", "Build", BUILD_OK, &[]),
            stage("deploy", "Deploy", DEPLOY_OK, DEPLOY_FAIL),
        ],
    )
}

pub fn scenarios() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::happy_path(),
        ScenarioConfig::new("lint-fail", "Fail Linting", "Code style violations detected")
            .failing_at("lint"),
        ScenarioConfig::new("test-fail", "Fail Unit Tests", "Test assertions failed")
            .failing_at("test"),
        ScenarioConfig::new("deploy-fail", "Deploy Crash", "Production deployment error")
            .failing_at("deploy"),
    ]
}

/// 100 ms warm-up, 400 ms per stage entry, 150–250 ms per line, 300 ms gap.
pub fn pacing() -> Pacing {
    Pacing::default()
}

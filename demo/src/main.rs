//! Stagehand DevOps Simulations: Demo CLI
//!
//! Plays the bundled simulations in the terminal. Each run uses the real
//! stagehand components (run controller, outcome policy, journal, auditor)
//! and prints the console transcript as it streams.
//!
//! Usage:
//!   cargo run -p stagehand-demo -- list
//!   cargo run -p stagehand-demo -- run cicd --scenario lint-fail
//!   cargo run -p stagehand-demo -- run actions --script matrix --seed 7
//!   cargo run -p stagehand-demo -- run-all --fast
//!   cargo run -p stagehand-demo -- check pipeline.toml

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stagehand_catalog::{catalog, ModuleId, SimulationModule};
use stagehand_contracts::{
    error::{StageError, StageResult},
    state::{RunState, StepStatus},
};
use stagehand_core::{RunOutcome, StartOutcome};
use stagehand_journal::{transcript_digest, InMemoryJournal};
use stagehand_policy::PlaybackConfig;
use stagehand_verify::{RunAuditor, ScriptLoader};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Stagehand: scripted DevOps pipeline simulations.
#[derive(Parser)]
#[command(
    name = "stagehand-demo",
    about = "Stagehand DevOps simulations demo",
    long_about = "Plays scripted CI/CD, GitHub Actions, Agile and Git branching simulations,\n\
                  then checks the journal's hash chain and audits the run invariants."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List modules with their scripts and scenarios.
    List,
    /// Play one simulation.
    Run {
        /// cicd | actions | agile | branching
        module: ModuleId,
        /// Script id within the module (default: the first script).
        #[arg(long)]
        script: Option<String>,
        /// Scenario id within the module (default: the first scenario).
        #[arg(long)]
        scenario: Option<String>,
        /// Seed for every random draw.
        #[arg(long)]
        seed: Option<u64>,
        /// Skip all pauses.
        #[arg(long)]
        fast: bool,
        /// Playback TOML overriding pacing and outcome settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Play every script under every scenario of every module.
    RunAll {
        /// Skip all pauses.
        #[arg(long)]
        fast: bool,
    },
    /// Validate an authored script document.
    Check {
        file: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::List => list(),
        Command::Run {
            module,
            script,
            scenario,
            seed,
            fast,
            config,
        } => {
            let request = RunRequest {
                script: script.as_deref(),
                scenario: scenario.as_deref(),
                seed,
            };
            match load_config(config, fast) {
                Ok(config) => run(module, &request, &config).await,
                Err(e) => Err(e),
            }
        }
        Command::RunAll { fast } => run_all(fast).await,
        Command::Check { file } => check(file),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>, fast: bool) -> StageResult<PlaybackConfig> {
    let config = match path {
        Some(path) => PlaybackConfig::from_file(&path)?,
        None => PlaybackConfig::default(),
    };
    Ok(if fast { config.with_instant_pacing() } else { config })
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn list() -> StageResult<()> {
    for module in catalog()? {
        println!("{} ({})", module.title(), module.id);
        for entry in &module.scripts {
            println!(
                "  script   {:<10} {} [{} steps]",
                entry.id(),
                entry.description,
                entry.script.step_count()
            );
        }
        for scenario in &module.scenarios {
            println!(
                "  scenario {:<10} {}: {}",
                scenario.scenario_id.as_str(),
                scenario.label,
                scenario.description
            );
        }
        println!();
    }
    Ok(())
}

struct RunRequest<'a> {
    script: Option<&'a str>,
    scenario: Option<&'a str>,
    seed: Option<u64>,
}

async fn run(id: ModuleId, request: &RunRequest<'_>, config: &PlaybackConfig) -> StageResult<()> {
    let module = SimulationModule::load(id)?;
    play(&module, request, config).await.map(|_| ())
}

async fn run_all(fast: bool) -> StageResult<()> {
    let config = load_config(None, fast)?;
    let mut played = 0;
    let mut clean = 0;
    for module in catalog()? {
        for entry in &module.scripts {
            for scenario in &module.scenarios {
                let request = RunRequest {
                    script: Some(entry.id()),
                    scenario: Some(scenario.scenario_id.as_str()),
                    seed: None,
                };
                played += 1;
                if play(&module, &request, &config).await? {
                    clean += 1;
                }
            }
        }
    }
    println!("{played} runs played, {clean} passed every audit rule.");
    if clean == played {
        Ok(())
    } else {
        Err(StageError::Playback {
            reason: format!("{} runs violated run invariants", played - clean),
        })
    }
}

fn check(file: PathBuf) -> StageResult<()> {
    let text = std::fs::read_to_string(&file).map_err(|e| StageError::Config {
        reason: format!("failed to read '{}': {}", file.display(), e),
    })?;
    let report = ScriptLoader::check_toml_str(&text)?;
    if report.passed {
        println!("{}: OK", file.display());
        return Ok(());
    }
    for failure in &report.failures {
        println!("  ✗ [{}] {}", failure.rule_id, failure.message);
    }
    Err(StageError::SchemaValidation {
        reason: format!("{} failed {} checks", file.display(), report.failures.len()),
    })
}

// ── Playback ──────────────────────────────────────────────────────────────────

/// Play one run, streaming its log. Returns whether the audit passed.
async fn play(
    module: &SimulationModule,
    request: &RunRequest<'_>,
    config: &PlaybackConfig,
) -> StageResult<bool> {
    let entry = module.script(request.script)?;
    let scenario = module.scenario(request.scenario)?.clone();

    let controller = module.controller(config, request.seed)?;
    let journal = Arc::new(InMemoryJournal::new());
    controller.add_observer(Box::new(Arc::clone(&journal)));

    println!();
    println!("━━ {} / {} / {} ━━", module.title(), entry.script.title(), scenario.label);
    for line in entry.source_lines() {
        println!("  │ {line}");
    }

    let mut updates = controller.subscribe();
    let handle = match controller.start(Arc::clone(&entry.script), scenario)? {
        StartOutcome::Started(handle) => handle,
        StartOutcome::AlreadyRunning => {
            return Err(StageError::Playback {
                reason: "a fresh controller reported a run in progress".to_string(),
            })
        }
    };

    let mut printed = 0;
    loop {
        let state = updates.borrow_and_update().clone();
        for line in state.log_lines.iter().skip(printed) {
            println!("  {line}");
        }
        printed = state.log_lines.len();
        if state.is_terminal() || updates.changed().await.is_err() {
            break;
        }
    }

    let state = match handle.wait().await? {
        RunOutcome::Completed(state) => state,
        RunOutcome::Cancelled => {
            return Err(StageError::Playback {
                reason: "run was cancelled".to_string(),
            })
        }
    };

    print_summary(&state, entry.script.steps().iter().map(|s| s.name.as_str()));

    let report = RunAuditor::new().audit_journal(&journal);
    let export = journal.export();
    println!();
    println!(
        "  journal   {} entries, chain {}",
        export.entries.len(),
        if journal.verify_integrity() { "intact" } else { "BROKEN" }
    );
    println!("  terminal  {}", export.terminal_hash);
    println!("  digest    {}", transcript_digest(&state.log_lines));
    if report.passed {
        println!("  audit     all run invariants hold");
    } else {
        println!("  audit     {}", report.summary());
    }

    Ok(report.passed)
}

fn print_summary<'a>(state: &RunState, names: impl Iterator<Item = &'a str>) {
    println!();
    println!("  Result: {}", state.phase.as_str().to_uppercase());
    for ((id, status), name) in state.step_statuses.iter().zip(names) {
        let icon = match status {
            StepStatus::Pending => "○",
            StepStatus::Running => "◐",
            StepStatus::Success => "✓",
            StepStatus::Failed => "✗",
        };
        let duration = state
            .duration_of(id)
            .map(|d| format!("{d:.1}s"))
            .unwrap_or_default();
        println!("  {icon} {name:<24} {:<8} {duration}", status.as_str());
    }
}

//! Simulation modules: scripts, scenarios and settings for each simulator.

use std::{fmt, str::FromStr, sync::Arc};

use tracing::info;

use stagehand_contracts::{
    error::{StageError, StageResult},
    scenario::ScenarioConfig,
    script::StepScript,
};
use stagehand_core::{controller::RunController, pacing::Pacing, traits::OutcomePolicy};
use stagehand_policy::{OutcomeSettings, PlaybackConfig};

use crate::{actions, agile, branching, cicd};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleId {
    Cicd,
    Actions,
    Agile,
    Branching,
}

impl ModuleId {
    pub const ALL: [ModuleId; 4] = [
        ModuleId::Cicd,
        ModuleId::Actions,
        ModuleId::Agile,
        ModuleId::Branching,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::Cicd => "cicd",
            ModuleId::Actions => "actions",
            ModuleId::Agile => "agile",
            ModuleId::Branching => "branching",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ModuleId::Cicd => "CI/CD Pipeline",
            ModuleId::Actions => "GitHub Actions",
            ModuleId::Agile => "Agile Lifecycle",
            ModuleId::Branching => "Git Branching",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleId {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| StageError::Config {
                reason: format!(
                    "unknown module '{}' (expected one of: cicd, actions, agile, branching)",
                    s
                ),
            })
    }
}

/// One playable script of a module.
#[derive(Debug, Clone)]
pub struct ScriptEntry {
    pub script: Arc<StepScript>,
    pub description: String,
    /// Source shown beside the simulation, e.g. a workflow's YAML.
    pub source_text: Option<String>,
}

impl ScriptEntry {
    fn new(script: StepScript, description: impl Into<String>) -> Self {
        Self {
            script: Arc::new(script),
            description: description.into(),
            source_text: None,
        }
    }

    pub fn id(&self) -> &str {
        self.script.script_id()
    }

    /// Lines of the source shown beside the simulation; empty when there is none.
    pub fn source_lines(&self) -> impl Iterator<Item = &str> {
        self.source_text.as_deref().unwrap_or_default().lines()
    }
}

/// A simulator: its scripts, its scenarios and how it plays them.
#[derive(Debug, Clone)]
pub struct SimulationModule {
    pub id: ModuleId,
    pub scripts: Vec<ScriptEntry>,
    /// The first scenario is the default.
    pub scenarios: Vec<ScenarioConfig>,
    pub pacing: Pacing,
    pub outcome: OutcomeSettings,
}

impl SimulationModule {
    /// Build the module `id` from its bundled content.
    pub fn load(id: ModuleId) -> StageResult<Self> {
        let module = match id {
            ModuleId::Cicd => Self {
                id,
                scripts: vec![ScriptEntry::new(
                    cicd::pipeline_script()?,
                    "Commit → Lint → Unit Test → Build → Deploy",
                )],
                scenarios: cicd::scenarios(),
                pacing: cicd::pacing(),
                outcome: OutcomeSettings::scripted(),
            },
            ModuleId::Actions => Self {
                id,
                scripts: actions::WORKFLOWS
                    .iter()
                    .map(|w| -> StageResult<ScriptEntry> {
                        let mut entry = ScriptEntry::new(w.script()?, w.description);
                        entry.source_text = Some(w.yaml.to_string());
                        Ok(entry)
                    })
                    .collect::<StageResult<_>>()?,
                scenarios: vec![ScenarioConfig::new(
                    "random",
                    "Random Outcome",
                    "Each stage fails with a 5% chance",
                )],
                pacing: actions::pacing(),
                outcome: OutcomeSettings::scripted_or_random(actions::FAILURE_PROBABILITY),
            },
            ModuleId::Agile => Self {
                id,
                scripts: agile::TICKETS
                    .iter()
                    .enumerate()
                    .map(|(i, t)| -> StageResult<ScriptEntry> {
                        Ok(ScriptEntry::new(t.script(i + 1)?, t.title))
                    })
                    .collect::<StageResult<_>>()?,
                scenarios: vec![ScenarioConfig::new(
                    "deliver",
                    "Deliver Ticket",
                    "Ticket flows from backlog to production",
                )],
                pacing: agile::pacing(),
                outcome: OutcomeSettings::always_succeed(),
            },
            ModuleId::Branching => Self {
                id,
                scripts: branching::STRATEGIES
                    .iter()
                    .map(|s| -> StageResult<ScriptEntry> {
                        Ok(ScriptEntry::new(s.script()?, s.branches.join(", ")))
                    })
                    .collect::<StageResult<_>>()?,
                scenarios: vec![ScenarioConfig::new(
                    "replay",
                    "Replay History",
                    "Commits appear one at a time",
                )],
                pacing: branching::pacing(),
                outcome: OutcomeSettings::always_succeed(),
            },
        };
        Ok(module)
    }

    pub fn title(&self) -> &'static str {
        self.id.title()
    }

    /// The script with `id`, or the first script when `id` is `None`.
    pub fn script(&self, id: Option<&str>) -> StageResult<&ScriptEntry> {
        let found = match id {
            Some(id) => self.scripts.iter().find(|s| s.id() == id),
            None => self.scripts.first(),
        };
        found.ok_or_else(|| StageError::Config {
            reason: format!(
                "module '{}' has no script '{}'",
                self.id,
                id.unwrap_or_default()
            ),
        })
    }

    /// The scenario with `id`, or the default scenario when `id` is `None`.
    pub fn scenario(&self, id: Option<&str>) -> StageResult<&ScenarioConfig> {
        let found = match id {
            Some(id) => self.scenarios.iter().find(|s| s.scenario_id.as_str() == id),
            None => self.scenarios.first(),
        };
        found.ok_or_else(|| StageError::Config {
            reason: format!(
                "module '{}' has no scenario '{}'",
                self.id,
                id.unwrap_or_default()
            ),
        })
    }

    /// A controller wired with this module's pacing and policy.
    ///
    /// `overrides` replaces individual settings; `seed` makes every random
    /// draw reproducible.
    pub fn controller(
        &self,
        overrides: &PlaybackConfig,
        seed: Option<u64>,
    ) -> StageResult<RunController> {
        let pacing = overrides.pacing_over(self.pacing)?;
        let outcome = overrides.outcome_over(self.outcome).with_seed(seed);
        let policy = outcome.build_policy();
        info!(
            module = %self.id,
            policy = policy.describe(),
            seeded = outcome.seed.is_some(),
            "controller configured"
        );
        Ok(RunController::new(policy, pacing, outcome.jitter_source()))
    }
}

/// Every simulation module, in menu order.
pub fn catalog() -> StageResult<Vec<SimulationModule>> {
    ModuleId::ALL.into_iter().map(SimulationModule::load).collect()
}

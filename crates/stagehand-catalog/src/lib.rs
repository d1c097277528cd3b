//! # stagehand-catalog
//!
//! The DevOps teaching simulations, as data for the stagehand engine.
//!
//! Four modules are bundled:
//!
//! 1. **CI/CD Pipeline**: five stages with scripted failure scenarios.
//! 2. **GitHub Actions**: three workflows whose stages fail at random.
//! 3. **Agile Lifecycle**: a ticket's path from planning to release.
//! 4. **Git Branching**: Git Flow and trunk-based histories, commit by commit.
//!
//! All content is hardcoded and fictional. Nothing runs for real.

pub mod actions;
pub mod agile;
pub mod branching;
pub mod cicd;
pub mod module;

pub use module::{catalog, ModuleId, ScriptEntry, SimulationModule};

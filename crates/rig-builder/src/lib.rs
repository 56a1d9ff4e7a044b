//! # rig-builder
//!
//! The Builder Orchestrator: archetype-aware pipeline sequencing, script collection, the
//! components data file, and publish/scaffolding operations (§4.4).

pub mod component_file;
pub mod orchestrator;
pub mod publish;
pub mod scaffold;
pub mod script_runner;
pub mod scripts;

pub use component_file::{load_components, save_components, ComponentFileEntry};
pub use orchestrator::Builder;
pub use publish::publish;
pub use scaffold::{create_rig_environment, new_rig_environment_from_archetype};
pub use script_runner::{LoggingScriptRunner, ScriptRunner};
pub use scripts::{ScriptCollector, ScriptKind};

//! # rig-config
//!
//! The rig configuration file model, archetype chain resolution, and logging setup.

mod archetype;
mod logging;
mod rig_file;

pub use archetype::{ArchetypeResolver, ChainNode};
pub use logging::{LogConfig, LogFormat};
pub use rig_file::{resolve_path, RigFileData, StringOrList};

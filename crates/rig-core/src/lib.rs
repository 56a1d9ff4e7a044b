//! # rig-core
//!
//! Error types and the opaque scene handle shared across every rig-assembly crate.

pub mod error;
pub mod handle;
pub mod scene_host;

pub use error::{Error, Result};
pub use handle::Handle;
pub use scene_host::{RelativeDirection, SceneHost};

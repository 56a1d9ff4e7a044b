//! The external scene-graph facade (§6.3).
//!
//! The core never touches a DCC scene graph directly; every mutation it performs is expressed
//! through this trait. Kept in `rig-core` (alongside [`crate::Handle`]) because both the data
//! merge engine and the component lifecycle need it.

use crate::{Handle, Result};
use std::path::Path;

/// Direction of a hierarchy query against [`SceneHost::list_relatives`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDirection {
    /// Immediate parent(s).
    Parents,
    /// Immediate children.
    Children,
}

/// The services the core consumes from the host DCC scene graph (§6.3).
///
/// Every method is defined abstractly over opaque [`Handle`]s; no implementation detail of a
/// concrete scene graph leaks through this boundary.
pub trait SceneHost: std::fmt::Debug {
    /// Create a new scene group and return its handle.
    fn create_container(&self, name: &str) -> Result<Handle>;

    /// Delete a container and everything parented beneath it.
    fn delete_container(&self, handle: &Handle) -> Result<()>;

    /// Tag a node so it can later be found via [`SceneHost::get_tagged`].
    fn tag(&self, handle: &Handle, tag_name: &str, extra: Option<&str>) -> Result<()>;

    /// Return every handle carrying the given tag.
    fn get_tagged(&self, tag_name: &str) -> Result<Vec<Handle>>;

    /// Reversibly set an attribute value on a node, declaring it first if absent.
    fn set_attr(&self, handle: &Handle, attr: &str, value: &serde_json::Value) -> Result<()>;

    /// Read an attribute value, or `None` if it was never set.
    fn get_attr(&self, handle: &Handle, attr: &str) -> Result<Option<serde_json::Value>>;

    /// Declare an attribute of a given logical type without assigning a value.
    fn add_attr(&self, handle: &Handle, attr: &str, data_type: &str) -> Result<()>;

    /// Parent `child` under `parent`.
    fn parent(&self, child: &Handle, parent: &Handle) -> Result<()>;

    /// List a node's parents or children.
    fn list_relatives(&self, handle: &Handle, direction: RelativeDirection) -> Result<Vec<Handle>>;

    /// Import a file into the scene, returning the handles it introduced.
    fn import_file(&self, path: &Path) -> Result<Vec<Handle>>;

    /// Save the current scene to `path` in the given format.
    fn save_scene(&self, path: &Path, format: &str) -> Result<()>;

    /// Whether a handle currently exists in the scene.
    fn handle_exists(&self, handle: &Handle) -> bool;
}

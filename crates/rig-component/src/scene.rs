//! The in-memory [`SceneHost`] reference implementation (§6.3, §9).
//!
//! This is the scene-graph facade this crate's own tests drive the component lifecycle against.
//! A real DCC integration provides its own [`SceneHost`]; nothing here is wired into a rig build
//! outside of tests.

use dashmap::DashMap;
use rig_core::{Error, Handle, RelativeDirection, Result, SceneHost};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default, Clone)]
struct Node {
    attrs: BTreeMap<String, serde_json::Value>,
    tags: BTreeMap<String, Option<String>>,
    parents: Vec<Handle>,
    children: Vec<Handle>,
}

/// An in-process scene graph backed by `DashMap`, standing in for a real DCC scene during tests.
#[derive(Debug, Default)]
pub struct InMemorySceneHost {
    nodes: DashMap<Handle, Node>,
    counter: AtomicU64,
}

impl InMemorySceneHost {
    /// An empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn require(&self, handle: &Handle) -> Result<()> {
        if self.nodes.contains_key(handle) {
            Ok(())
        } else {
            Err(Error::configuration(format!("unknown scene handle: {handle}")))
        }
    }

    fn delete_recursive(&self, handle: &Handle) {
        let children = self
            .nodes
            .get(handle)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in &children {
            self.delete_recursive(child);
        }
        if let Some((_, node)) = self.nodes.remove(handle) {
            for parent in node.parents {
                if let Some(mut parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.retain(|c| c != handle);
                }
            }
        }
    }
}

impl SceneHost for InMemorySceneHost {
    fn create_container(&self, name: &str) -> Result<Handle> {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        let handle = Handle::new(format!("{name}#{index}"));
        self.nodes.insert(handle.clone(), Node::default());
        Ok(handle)
    }

    fn delete_container(&self, handle: &Handle) -> Result<()> {
        self.require(handle)?;
        self.delete_recursive(handle);
        Ok(())
    }

    fn tag(&self, handle: &Handle, tag_name: &str, extra: Option<&str>) -> Result<()> {
        let mut node = self
            .nodes
            .get_mut(handle)
            .ok_or_else(|| Error::configuration(format!("unknown scene handle: {handle}")))?;
        node.tags.insert(tag_name.to_string(), extra.map(str::to_string));
        Ok(())
    }

    fn get_tagged(&self, tag_name: &str) -> Result<Vec<Handle>> {
        Ok(self
            .nodes
            .iter()
            .filter(|entry| entry.value().tags.contains_key(tag_name))
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn set_attr(&self, handle: &Handle, attr: &str, value: &serde_json::Value) -> Result<()> {
        let mut node = self
            .nodes
            .get_mut(handle)
            .ok_or_else(|| Error::configuration(format!("unknown scene handle: {handle}")))?;
        node.attrs.insert(attr.to_string(), value.clone());
        Ok(())
    }

    fn get_attr(&self, handle: &Handle, attr: &str) -> Result<Option<serde_json::Value>> {
        self.require(handle)?;
        Ok(self
            .nodes
            .get(handle)
            .and_then(|node| node.attrs.get(attr).cloned()))
    }

    fn add_attr(&self, handle: &Handle, attr: &str, data_type: &str) -> Result<()> {
        let mut node = self
            .nodes
            .get_mut(handle)
            .ok_or_else(|| Error::configuration(format!("unknown scene handle: {handle}")))?;
        node.attrs
            .entry(attr.to_string())
            .or_insert_with(|| serde_json::Value::String(data_type.to_string()));
        Ok(())
    }

    fn parent(&self, child: &Handle, parent: &Handle) -> Result<()> {
        self.require(child)?;
        self.require(parent)?;
        if let Some(mut child_node) = self.nodes.get_mut(child) {
            if !child_node.parents.contains(parent) {
                child_node.parents.push(parent.clone());
            }
        }
        if let Some(mut parent_node) = self.nodes.get_mut(parent) {
            if !parent_node.children.contains(child) {
                parent_node.children.push(child.clone());
            }
        }
        Ok(())
    }

    fn list_relatives(&self, handle: &Handle, direction: RelativeDirection) -> Result<Vec<Handle>> {
        let node = self
            .nodes
            .get(handle)
            .ok_or_else(|| Error::configuration(format!("unknown scene handle: {handle}")))?;
        Ok(match direction {
            RelativeDirection::Parents => node.parents.clone(),
            RelativeDirection::Children => node.children.clone(),
        })
    }

    fn import_file(&self, path: &Path) -> Result<Vec<Handle>> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("imported");
        let handle = self.create_container(stem)?;
        Ok(vec![handle])
    }

    fn save_scene(&self, path: &Path, _format: &str) -> Result<()> {
        let mut handles: Vec<String> = self
            .nodes
            .iter()
            .map(|entry| entry.key().as_str().to_string())
            .collect();
        handles.sort();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&handles)?)?;
        Ok(())
    }

    fn handle_exists(&self, handle: &Handle) -> bool {
        self.nodes.contains_key(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_tag_roundtrip() {
        let host = InMemorySceneHost::new();
        let handle = host.create_container("spine").unwrap();
        host.tag(&handle, "rigComponentType", Some("spine")).unwrap();
        let tagged = host.get_tagged("rigComponentType").unwrap();
        assert_eq!(tagged, vec![handle]);
    }

    #[test]
    fn delete_container_removes_children() {
        let host = InMemorySceneHost::new();
        let parent = host.create_container("limb").unwrap();
        let child = host.create_container("limb_ctrl").unwrap();
        host.parent(&child, &parent).unwrap();

        host.delete_container(&parent).unwrap();
        assert!(!host.handle_exists(&parent));
        assert!(!host.handle_exists(&child));
    }

    #[test]
    fn delete_container_leaves_siblings_intact() {
        let host = InMemorySceneHost::new();
        let a = host.create_container("a").unwrap();
        let b = host.create_container("b").unwrap();

        host.delete_container(&a).unwrap();
        assert!(!host.handle_exists(&a));
        assert!(host.handle_exists(&b));
    }

    #[test]
    fn attr_roundtrip() {
        let host = InMemorySceneHost::new();
        let handle = host.create_container("chest").unwrap();
        assert_eq!(host.get_attr(&handle, "data").unwrap(), None);
        host.set_attr(&handle, "data", &serde_json::json!({"x": 1})).unwrap();
        assert_eq!(
            host.get_attr(&handle, "data").unwrap(),
            Some(serde_json::json!({"x": 1}))
        );
    }

    #[test]
    fn list_relatives_reports_both_directions() {
        let host = InMemorySceneHost::new();
        let parent = host.create_container("chest").unwrap();
        let child = host.create_container("arm").unwrap();
        host.parent(&child, &parent).unwrap();

        assert_eq!(
            host.list_relatives(&parent, RelativeDirection::Children).unwrap(),
            vec![child.clone()]
        );
        assert_eq!(
            host.list_relatives(&child, RelativeDirection::Parents).unwrap(),
            vec![parent]
        );
    }

    #[test]
    fn unknown_handle_errors() {
        let host = InMemorySceneHost::new();
        let bogus = Handle::new("nope".to_string());
        assert!(host.get_attr(&bogus, "x").is_err());
    }
}

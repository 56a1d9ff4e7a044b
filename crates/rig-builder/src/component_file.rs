//! The components data file (§3.1, §3.2, §6.2, §4.4 `load_components`/`saveComponents`).
//!
//! A components file carries the same `{dataType, data}` envelope every data file does (§6.2),
//! but its payload is an *ordered list* of component entries rather than an entity-key map: §5's
//! ordering guarantee ("components are processed in the order they appear in the components data
//! file") cannot survive a JSON object, whose key order this crate does not preserve. This is the
//! one data kind the Layered Data Merge Engine does not own — components are reconstructed as
//! live [`Component`] instances via the [`ComponentRegistry`], not merged as opaque payloads.

use rig_component::{Component, ComponentRegistry, ParameterValue};
use rig_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One component's serialized form (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFileEntry {
    /// Unique name within the rig.
    pub name: String,
    /// `module.ClassName` handler tag.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Ordered opaque entity identifiers.
    #[serde(default)]
    pub input: Vec<String>,
    /// Optional parent-hook identifier.
    #[serde(default, rename = "rigParent")]
    pub rig_parent: Option<String>,
    /// Optional grouping tag.
    #[serde(default, rename = "componentTag")]
    pub component_tag: Option<String>,
    /// `{paramName: {value, dataType}}` (§3.2). [`ParameterValue`]'s own `tag = "dataType",
    /// content = "value"` representation matches this wire shape exactly.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ComponentsFileDocument {
    #[serde(rename = "dataType")]
    data_type: String,
    data: Vec<ComponentFileEntry>,
}

const COMPONENTS_DATA_TYPE: &str = "ComponentData";

/// Parse a components file and instantiate a live [`Component`] for each entry, in file order
/// (§5).
///
/// # Errors
///
/// Returns an I/O or serialization error, or [`Error::UnknownDataType`] if an entry's `type` has
/// no registered behavior.
pub fn load_components(path: &Path, registry: &ComponentRegistry) -> Result<Vec<Component>> {
    let content = std::fs::read_to_string(path)?;
    let doc: ComponentsFileDocument = serde_json::from_str(&content)?;
    if doc.data_type != COMPONENTS_DATA_TYPE && doc.data_type != "AbstractData" {
        return Err(Error::data_file_type_mismatch(
            path.to_string_lossy(),
            doc.data_type,
            COMPONENTS_DATA_TYPE,
        ));
    }
    doc.data
        .into_iter()
        .map(|entry| {
            let behavior = registry.new_instance(&entry.component_type)?;
            Ok(Component::new(
                entry.name,
                entry.component_type,
                entry.input,
                entry.rig_parent,
                entry.component_tag,
                entry.parameters,
                behavior,
            ))
        })
        .collect()
}

/// Write the current state of `components` back to `path`, preserving their order (§4.4
/// `saveComponents`).
///
/// # Errors
///
/// Returns an I/O or serialization error.
pub fn save_components(components: &[Component], path: &Path) -> Result<()> {
    let data = components
        .iter()
        .map(|component| ComponentFileEntry {
            name: component.name().to_string(),
            component_type: component.component_type().to_string(),
            input: component.input().to_vec(),
            rig_parent: component.rig_parent().map(str::to_string),
            component_tag: component.component_tag().map(str::to_string),
            parameters: component.parameters().into_iter().collect(),
        })
        .collect();
    let doc = ComponentsFileDocument {
        data_type: COMPONENTS_DATA_TYPE.to_string(),
        data,
    };
    let content = serde_json::to_string_pretty(&doc)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_component::NoopBehavior;

    fn registry() -> ComponentRegistry {
        let registry = ComponentRegistry::new();
        registry.register("spine.Spine", || Box::new(NoopBehavior));
        registry.register("limb.Limb", || Box::new(NoopBehavior));
        registry
    }

    #[test]
    fn loads_entries_in_file_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("components.json");
        std::fs::write(
            &path,
            r#"{
                "dataType": "ComponentData",
                "data": [
                    {"name": "spine", "type": "spine.Spine", "input": ["spine_1"]},
                    {"name": "arm_l", "type": "limb.Limb", "input": ["shoulder_l"], "rigParent": "chest"}
                ]
            }"#,
        )
        .unwrap();

        let components = load_components(&path, &registry()).unwrap();
        let names: Vec<_> = components.iter().map(Component::name).collect();
        assert_eq!(names, vec!["spine", "arm_l"]);
        assert_eq!(components[1].rig_parent(), Some("chest"));
    }

    #[test]
    fn unknown_component_type_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("components.json");
        std::fs::write(
            &path,
            r#"{"dataType": "ComponentData", "data": [{"name": "x", "type": "nope.Nope"}]}"#,
        )
        .unwrap();

        let err = load_components(&path, &registry()).unwrap_err();
        assert!(matches!(err, Error::UnknownDataType(_)));
    }

    #[test]
    fn save_then_load_round_trips_order_and_parameters() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("components.json");
        let mut params = BTreeMap::new();
        params.insert("numJoints".to_string(), ParameterValue::Int(5));
        let registry = registry();
        let components = vec![Component::new(
            "spine",
            "spine.Spine",
            vec!["spine_1".to_string()],
            None,
            None,
            params,
            registry.new_instance("spine.Spine").unwrap(),
        )];

        save_components(&components, &path).unwrap();
        let reloaded = load_components(&path, &registry).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].name(), "spine");
        assert_eq!(
            reloaded[0].parameters(),
            vec![("numJoints".to_string(), ParameterValue::Int(5))]
        );
    }
}

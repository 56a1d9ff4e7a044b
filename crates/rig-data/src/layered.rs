//! The Layered Data Merge Engine (§4.2).

use crate::entity::sniff;
use crate::entity::{StorageLayout, ABSTRACT_DATA_TAG};
use crate::registry::DataModuleRegistry;
use rig_core::{Error, Handle, Result, SceneHost};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One of the three supported save policies (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    /// Unclaimed new keys land in the bottom (highest-priority) file of the stack.
    Merge,
    /// Unclaimed new keys land in an explicit new file.
    New,
    /// Every file in the stack is cleared of `changed`/`added` (but keeps `removed`) and a single
    /// new file receives the entire save set.
    Overwrite,
}

impl std::str::FromStr for MergeMethod {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "new" => Ok(Self::New),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(Error::invalid_merge_method(other)),
        }
    }
}

impl MergeMethod {
    /// The method name as it appears in rig files / CLI flags.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::New => "new",
            Self::Overwrite => "overwrite",
        }
    }
}

/// One file's planned mutation (§3.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanEntry {
    /// Keys whose stored value will be refreshed from the current scene state.
    pub changed: Vec<String>,
    /// Keys newly written to this file that it did not previously hold.
    pub added: Vec<String>,
    /// Keys that previously lived in this file but are no longer selected for save.
    pub removed: Vec<String>,
}

/// `file → {changed, added, removed}` (§3.5), in ascending stack order (lowest priority first).
pub type LayeredPlan = Vec<(PathBuf, PlanEntry)>;

fn plan_entry_mut<'a>(plan: &'a mut LayeredPlan, path: &Path) -> Option<&'a mut PlanEntry> {
    plan.iter_mut()
        .find(|(p, _)| p.as_path() == path)
        .map(|(_, e)| e)
}

/// Construct a save plan for `data_to_save` against `file_stack` (§4.2 `gatherLayeredSaveData`).
///
/// # Errors
///
/// - [`Error::UnknownDataType`] if `data_type` has no registered handler.
/// - [`Error::InvalidMergeMethod`] if `method` is not `merge`, `new`, or `overwrite`.
/// - [`Error::MissingTargetFile`] if `method` is `new`/`overwrite` without `file_name`.
/// - [`Error::InvalidLayeredPlan`] if the resulting plan would be empty (e.g. an empty
///   `file_stack` with no `file_name` to fall back on for `merge`).
pub fn gather_layered_save_data(
    data_to_save: &BTreeSet<String>,
    file_stack: &[PathBuf],
    data_type: &str,
    method: &str,
    file_name: Option<&Path>,
    registry: &DataModuleRegistry,
) -> Result<LayeredPlan> {
    if !registry.contains(data_type) {
        return Err(Error::unknown_data_type(data_type));
    }
    let method: MergeMethod = method.parse()?;

    // Filter the stack to files whose on-disk dataType matches, reading each file's keys along
    // the way (§4.2 steps 2–3).
    let mut filtered: Vec<PathBuf> = Vec::new();
    let mut source_keys: Vec<Vec<String>> = Vec::new();
    for file in file_stack {
        if !file.exists() {
            continue;
        }
        let doc = sniff(file)?;
        if doc.data_type != data_type && doc.data_type != ABSTRACT_DATA_TAG {
            continue;
        }
        filtered.push(file.clone());
        source_keys.push(doc.data.keys().cloned().collect());
    }

    let mut plan: LayeredPlan = filtered
        .iter()
        .map(|f| (f.clone(), PlanEntry::default()))
        .collect();

    // Walk the filtered stack in reverse — "bottom" (highest priority, per §4.2's definition) to
    // lowest priority — so a key present in multiple layers is always claimed by its highest-
    // priority (lowest-index-from-the-end) occurrence.
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    for (file, keys) in filtered.iter().zip(source_keys.iter()).rev() {
        let entry = plan_entry_mut(&mut plan, file)
            .ok_or_else(|| Error::invalid_layered_plan("entry missing for filtered file"))?;
        for key in keys {
            if data_to_save.contains(key) {
                if claimed.insert(key.clone()) {
                    entry.changed.push(key.clone());
                }
                // Already claimed by a higher-priority layer: leave this layer's copy untouched.
            } else {
                entry.removed.push(key.clone());
            }
        }
    }

    let unsaved: Vec<String> = data_to_save
        .iter()
        .filter(|k| !claimed.contains(*k))
        .cloned()
        .collect();

    match method {
        MergeMethod::Merge => {
            let bottom = filtered
                .last()
                .ok_or_else(|| Error::invalid_layered_plan("no file in stack to merge into"))?
                .clone();
            plan_entry_mut(&mut plan, &bottom)
                .ok_or_else(|| Error::invalid_layered_plan("bottom file missing a plan entry"))?
                .added
                .extend(unsaved);
        }
        MergeMethod::New => {
            let file_name = file_name
                .ok_or_else(|| Error::missing_target_file("new"))?
                .to_path_buf();
            match plan_entry_mut(&mut plan, &file_name) {
                Some(entry) => entry.added.extend(unsaved),
                None => plan.push((
                    file_name,
                    PlanEntry {
                        changed: Vec::new(),
                        added: unsaved,
                        removed: Vec::new(),
                    },
                )),
            }
        }
        MergeMethod::Overwrite => {
            let file_name = file_name
                .ok_or_else(|| Error::missing_target_file("overwrite"))?
                .to_path_buf();
            for (_, entry) in plan.iter_mut() {
                entry.changed.clear();
                entry.added.clear();
            }
            plan.push((
                file_name,
                PlanEntry {
                    changed: Vec::new(),
                    added: data_to_save.iter().cloned().collect(),
                    removed: Vec::new(),
                },
            ));
        }
    }

    if plan.is_empty() {
        return Err(Error::invalid_layered_plan("plan has no file entries"));
    }
    Ok(plan)
}

/// Validate a plan loaded from an external (non-Rust-typed) source, e.g. a JSON artifact a tool
/// wrote out for inspection. Rust's type system already guarantees [`PlanEntry`] carries all
/// three lists for plans built by [`gather_layered_save_data`]; this function exists for plans
/// that round-tripped through an untyped representation (§4.2 "Plan validation", P4).
///
/// # Errors
///
/// Returns [`Error::InvalidLayeredPlan`] if the value is not a non-empty JSON object whose every
/// entry has `changed`, `added`, and `removed` arrays.
pub fn validate_plan_json(value: &serde_json::Value) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::invalid_layered_plan("plan is not an object"))?;
    if object.is_empty() {
        return Err(Error::invalid_layered_plan("plan has no file entries"));
    }
    for (file, entry) in object {
        let entry = entry
            .as_object()
            .ok_or_else(|| Error::invalid_layered_plan(format!("entry for '{file}' is not an object")))?;
        for key in ["changed", "added", "removed"] {
            if !entry.get(key).is_some_and(serde_json::Value::is_array) {
                return Err(Error::invalid_layered_plan(format!(
                    "entry for '{file}' is missing '{key}'"
                )));
            }
        }
    }
    Ok(())
}

/// Execute a save plan (§4.2 `performLayeredSave`).
///
/// For each file: read its old contents (if it exists), gather fresh data for every
/// `changed ∪ added` key, remove every `removed` key from the old contents, merge new over old,
/// and write the result. Errors on one file propagate immediately; files already written by this
/// call are not rolled back (§4.2).
///
/// # Errors
///
/// Returns the first per-file I/O, serialization, or scene-query error encountered.
pub fn perform_layered_save(
    plan: &LayeredPlan,
    data_type: &str,
    registry: &DataModuleRegistry,
    host: &dyn SceneHost,
) -> Result<()> {
    for (file, entry) in plan {
        let mut old = registry.new_instance(data_type)?;
        if file.exists() {
            old.read(file)?;
        }

        let mut fresh = registry.new_instance(data_type)?;
        for key in entry.changed.iter().chain(entry.added.iter()) {
            fresh.gather_data(&Handle::new(key.clone()), host)?;
        }

        old.remove_keys(&entry.removed);
        old.merge_from(&*fresh);
        old.write(file)?;
    }
    Ok(())
}

/// Load an ordered file stack of one data kind, applying each file's data onto the scene in
/// ascending stack order (§4.2 "Loading", §5 ordering guarantees). Per-file failures are logged
/// and skipped — missing optional data is never fatal (§7).
pub fn load_layered(
    file_stack: &[PathBuf],
    data_type: &str,
    registry: &DataModuleRegistry,
    host: &dyn SceneHost,
) {
    for file in file_stack {
        if let Err(e) = load_one(file, data_type, registry, host) {
            tracing::warn!(file = %file.display(), error = %e, "failed to load data file, skipping");
        }
    }
}

fn load_one(
    file: &Path,
    data_type: &str,
    registry: &DataModuleRegistry,
    host: &dyn SceneHost,
) -> Result<()> {
    let mut handler = registry.new_instance(data_type)?;
    match handler.storage_layout() {
        StorageLayout::SingleFile => {
            handler.read(file)?;
        }
        StorageLayout::DirectoryPerEntity { extension } => {
            load_directory(&mut *handler, file, &extension)?;
        }
    }
    let keys = handler.get_keys();
    handler.apply_data(&keys, host);
    Ok(())
}

/// Populate `handler` by reading every `*.<extension>` file directly inside `dir`, one entity per
/// file, keyed by file stem (§4.2 "Supplemented: directory-backed multi-file kinds").
fn load_directory(
    handler: &mut dyn crate::DataEntity,
    dir: &Path,
    extension: &str,
) -> Result<()> {
    let mut data = serde_json::Map::new();
    let entries = std::fs::read_dir(dir)?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)?;
        let payload: serde_json::Value = serde_json::from_str(&content)?;
        data.insert(stem.to_string(), payload);
    }
    handler.set_data(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataModuleRegistry;
    use std::collections::BTreeMap;
    use std::fs;

    fn write_data_file(path: &Path, data_type: &str, keys: &[&str]) {
        let mut data = serde_json::Map::new();
        for k in keys {
            data.insert((*k).to_string(), serde_json::Value::Bool(true));
        }
        let doc = serde_json::json!({ "dataType": data_type, "data": data });
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    }

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn s1_merge_claims_lowest_layer_and_appends_new_to_bottom() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base.json");
        let rig = tmp.path().join("rig.json");
        write_data_file(&base, "JointData", &["hip", "spine"]);
        write_data_file(&rig, "JointData", &["spine", "head"]);

        let registry = DataModuleRegistry::with_standard_kinds();
        let plan = gather_layered_save_data(
            &keys(&["hip", "spine", "head", "jaw"]),
            &[base.clone(), rig.clone()],
            "JointData",
            "merge",
            None,
            &registry,
        )
        .unwrap();

        let base_entry = plan.iter().find(|(p, _)| p == &base).unwrap().1.clone();
        let rig_entry = plan.iter().find(|(p, _)| p == &rig).unwrap().1.clone();

        assert_eq!(base_entry.changed, vec!["hip".to_string()]);
        assert!(base_entry.added.is_empty());
        assert!(base_entry.removed.is_empty());

        let mut rig_changed = rig_entry.changed.clone();
        rig_changed.sort();
        assert_eq!(rig_changed, vec!["head".to_string(), "spine".to_string()]);
        assert_eq!(rig_entry.added, vec!["jaw".to_string()]);
        assert!(rig_entry.removed.is_empty());
    }

    #[test]
    fn s2_overwrite_clears_changed_added_and_collects_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base.json");
        write_data_file(&base, "JointData", &["A", "B", "C"]);
        let final_file = tmp.path().join("final.json");

        let registry = DataModuleRegistry::with_standard_kinds();
        let plan = gather_layered_save_data(
            &keys(&["A", "D"]),
            &[base.clone()],
            "JointData",
            "overwrite",
            Some(&final_file),
            &registry,
        )
        .unwrap();

        let base_entry = plan.iter().find(|(p, _)| p == &base).unwrap().1.clone();
        assert!(base_entry.changed.is_empty());
        assert!(base_entry.added.is_empty());
        let mut removed = base_entry.removed.clone();
        removed.sort();
        assert_eq!(removed, vec!["B".to_string(), "C".to_string()]);

        let final_entry = plan.iter().find(|(p, _)| p == &final_file).unwrap().1.clone();
        let mut added = final_entry.added.clone();
        added.sort();
        assert_eq!(added, vec!["A".to_string(), "D".to_string()]);
        assert!(final_entry.changed.is_empty());
        assert!(final_entry.removed.is_empty());
    }

    #[test]
    fn s6_unknown_kind_errors_before_touching_files() {
        let registry = DataModuleRegistry::with_standard_kinds();
        let err = gather_layered_save_data(
            &keys(&["a"]),
            &[PathBuf::from("/does/not/matter.json")],
            "FooBar",
            "merge",
            None,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownDataType(tag) if tag == "FooBar"));
    }

    #[test]
    fn p9_mixed_kind_stack_is_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let joints = tmp.path().join("joints.json");
        let guides = tmp.path().join("guides.json");
        write_data_file(&joints, "JointData", &["hip"]);
        write_data_file(&guides, "GuideData", &["hip_guide"]);

        let registry = DataModuleRegistry::with_standard_kinds();
        let plan = gather_layered_save_data(
            &keys(&["hip"]),
            &[joints.clone(), guides.clone()],
            "JointData",
            "merge",
            None,
            &registry,
        )
        .unwrap();

        assert!(plan.iter().any(|(p, _)| p == &joints));
        assert!(!plan.iter().any(|(p, _)| p == &guides));
    }

    #[test]
    fn invalid_method_is_rejected() {
        let registry = DataModuleRegistry::with_standard_kinds();
        let err = gather_layered_save_data(
            &keys(&["a"]),
            &[],
            "JointData",
            "bogus",
            None,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidMergeMethod(_)));
    }

    #[test]
    fn validate_plan_json_rejects_missing_list() {
        let value = serde_json::json!({
            "rig.json": { "changed": [], "added": [] }
        });
        let err = validate_plan_json(&value).unwrap_err();
        assert!(matches!(err, Error::InvalidLayeredPlan(_)));
    }

    #[test]
    fn validate_plan_json_accepts_well_formed_plan() {
        let value = serde_json::json!({
            "rig.json": { "changed": [], "added": [], "removed": [] }
        });
        validate_plan_json(&value).unwrap();
    }
}

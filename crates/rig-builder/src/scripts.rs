//! Archetype script collection (§3.6, §4.4 "Archetype script expansion", §11.2).

use rig_config::{ChainNode, RigFileData};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Which of a rig's three script-list fields to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `preScript`.
    Pre,
    /// `postScript`.
    Post,
    /// `pubScript`.
    Pub,
}

/// Collects one script list across an archetype chain, nearest-first, de-duplicated (§3.6, P7).
///
/// Grounded on the original's `GetCompleteScriptList.findScripts`: scripts are first gathered
/// into a `depth → scripts` map, then flattened depth-first. The intermediate map has no effect
/// on the final order but is kept (§11.2) because a caller driving a long chain can report
/// "expanding archetype scripts at depth N" while [`ScriptCollector::collect_by_depth`] is still
/// running.
#[derive(Debug, Default)]
pub struct ScriptCollector;

impl ScriptCollector {
    /// Collect and flatten one script kind across `chain` (as produced by
    /// `ArchetypeResolver::resolve_chain`).
    #[must_use]
    pub fn collect(chain: &[ChainNode], kind: ScriptKind) -> Vec<PathBuf> {
        Self::flatten(Self::collect_by_depth(chain, kind))
    }

    /// Group `kind`'s resolved script paths by the chain depth they were declared at.
    #[must_use]
    pub fn collect_by_depth(chain: &[ChainNode], kind: ScriptKind) -> BTreeMap<u32, Vec<PathBuf>> {
        let mut by_depth: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
        for node in chain {
            let list = match kind {
                ScriptKind::Pre => &node.data.pre_script,
                ScriptKind::Post => &node.data.post_script,
                ScriptKind::Pub => &node.data.pub_script,
            };
            let resolved = RigFileData::resolve_list(list, &node.env_dir);
            by_depth.entry(node.depth).or_default().extend(resolved);
        }
        by_depth
    }

    /// Flatten a depth-grouped map into a single ordered list, ascending depth (nearest rig
    /// first), dropping a path on its second occurrence (P7).
    #[must_use]
    pub fn flatten(by_depth: BTreeMap<u32, Vec<PathBuf>>) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for scripts in by_depth.into_values() {
            for script in scripts {
                if seen.insert(script.clone()) {
                    out.push(script);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_config::ArchetypeResolver;
    use std::fs;
    use std::path::Path;

    fn write_rig(dir: &Path, name: &str, archetypes: &[&str], pre_script: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let rig_file = dir.join(format!("{name}.rig"));
        let base_archetype = serde_json::to_string(archetypes).unwrap();
        let body = format!(
            r#"{{"rigName": "{name}", "baseArchetype": {base_archetype}, "preScript": "{pre_script}"}}"#
        );
        fs::write(&rig_file, body).unwrap();
        rig_file
    }

    #[test]
    fn p7_nearest_first_with_duplicate_suppressed() {
        let tmp = tempfile::tempdir().unwrap();
        let archetypes_root = tmp.path().join("archetypes");
        write_rig(&archetypes_root.join("c"), "c", &[], "sC.py");
        write_rig(&archetypes_root.join("b"), "b", &["c"], "sB.py");
        let rig_dir = tmp.path().join("rig_a");
        let rig_file = write_rig(&rig_dir, "a", &["b"], "sA.py");

        let resolver = ArchetypeResolver::new(vec![archetypes_root]);
        let chain = resolver.resolve_chain(&rig_file).unwrap();

        let scripts = ScriptCollector::collect(&chain, ScriptKind::Pre);
        let names: Vec<_> = scripts
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["sA.py", "sB.py", "sC.py"]);
    }

    #[test]
    fn diamond_inheritance_collapses_shared_ancestor_script_to_one_occurrence() {
        // a -> [b, d], b -> [c], d -> [c]: c's script is reachable via two paths but resolves to
        // the same absolute path both times, so it must appear exactly once in the flattened list.
        let tmp = tempfile::tempdir().unwrap();
        let archetypes_root = tmp.path().join("archetypes");
        write_rig(&archetypes_root.join("c"), "c", &[], "shared.py");
        write_rig(&archetypes_root.join("b"), "b", &["c"], "sB.py");
        write_rig(&archetypes_root.join("d"), "d", &["c"], "sD.py");
        let rig_dir = tmp.path().join("rig_a");
        let rig_file = write_rig(&rig_dir, "a", &["b", "d"], "sA.py");

        let resolver = ArchetypeResolver::new(vec![archetypes_root]);
        let chain = resolver.resolve_chain(&rig_file).unwrap();
        let scripts = ScriptCollector::collect(&chain, ScriptKind::Pre);

        let names: Vec<_> = scripts
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["sA.py", "sB.py", "sD.py", "shared.py"]);
    }
}

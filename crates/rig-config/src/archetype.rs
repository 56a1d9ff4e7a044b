//! Archetype chain resolution (§3.1, §4.4).
//!
//! An archetype is itself a rig directory containing a `.rig` file. A concrete rig's
//! `baseArchetype` list names zero or more archetypes by identifier; each is resolved from a
//! registered search path and composed transitively, depth-first, ancestor order.

use crate::rig_file::RigFileData;
use rig_core::{Error, Result};
use std::path::{Path, PathBuf};

/// One node of a resolved archetype chain.
#[derive(Debug, Clone)]
pub struct ChainNode {
    /// Path to this node's `.rig` file.
    pub rig_file: PathBuf,
    /// This node's resolved environment directory (§3.1 `rigEnv`).
    pub env_dir: PathBuf,
    /// The parsed rig file contents.
    pub data: RigFileData,
    /// Recursion depth: 0 for the concrete rig itself, 1 for its direct archetype(s), and so on.
    ///
    /// Kept per §3.6 / §11.2: the original tool groups collected scripts by this depth before
    /// flattening, and a caller driving a long archetype chain can report progress by depth.
    pub depth: u32,
}

/// Resolves archetype identifiers to on-disk rig directories and walks `baseArchetype` chains.
#[derive(Debug, Clone, Default)]
pub struct ArchetypeResolver {
    search_paths: Vec<PathBuf>,
}

impl ArchetypeResolver {
    /// Build a resolver over the given archetype search directories, checked in order.
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Locate the directory for a named archetype: the first search path containing a
    /// subdirectory `name` that itself contains exactly one `.rig` file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no search path has a matching, valid archetype
    /// directory.
    pub fn find_rig_file(&self, name: &str) -> Result<PathBuf> {
        for root in &self.search_paths {
            let candidate_dir = root.join(name);
            if let Some(rig_file) = find_rig_file_in(&candidate_dir) {
                return Ok(rig_file);
            }
        }
        Err(Error::configuration(format!(
            "archetype '{name}' not found in any search path"
        )))
    }

    /// List archetype identifiers available across all search paths: every immediate
    /// subdirectory of a search path that contains a `.rig` file.
    ///
    /// # Errors
    ///
    /// Returns an error if a search path cannot be read.
    pub fn list_available(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for root in &self.search_paths {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries {
                let entry = entry.map_err(Error::from)?;
                let path = entry.path();
                if path.is_dir() && find_rig_file_in(&path).is_some() {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Resolve the full chain for a concrete rig file: the rig itself at depth 0, followed
    /// depth-first by each entry of its `baseArchetype` list (ancestor order) and their own
    /// chains recursively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the rig file is malformed or an archetype it names
    /// cannot be located.
    pub fn resolve_chain(&self, rig_file: &Path) -> Result<Vec<ChainNode>> {
        let data = RigFileData::load(rig_file)?;
        let rig_file_dir = rig_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let env_dir = data.env_dir(&rig_file_dir);
        self.resolve_node(rig_file.to_path_buf(), env_dir, data, 0, &mut Vec::new())
    }

    fn resolve_node(
        &self,
        rig_file: PathBuf,
        env_dir: PathBuf,
        data: RigFileData,
        depth: u32,
        visiting: &mut Vec<PathBuf>,
    ) -> Result<Vec<ChainNode>> {
        if visiting.contains(&rig_file) {
            return Err(Error::configuration(format!(
                "archetype cycle detected at {rig_file:?}"
            )));
        }
        visiting.push(rig_file.clone());

        let archetypes = data.base_archetype.0.clone();
        let mut chain = vec![ChainNode {
            rig_file: rig_file.clone(),
            env_dir,
            data,
            depth,
        }];

        for archetype_name in &archetypes {
            let archetype_rig_file = self.find_rig_file(archetype_name)?;
            let archetype_data = RigFileData::load(&archetype_rig_file)?;
            let archetype_dir = archetype_rig_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let archetype_env_dir = archetype_data.env_dir(&archetype_dir);
            chain.extend(self.resolve_node(
                archetype_rig_file,
                archetype_env_dir,
                archetype_data,
                depth + 1,
                visiting,
            )?);
        }

        visiting.pop();
        Ok(chain)
    }
}

/// Find the single `.rig` file directly inside `dir`, if any (mirrors the original tool's
/// `findRigFile`).
fn find_rig_file_in(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("rig") {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_rig(dir: &Path, name: &str, archetype: Option<&str>) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let rig_file = dir.join(format!("{name}.rig"));
        let body = match archetype {
            Some(a) => format!(r#"{{"rigName": "{name}", "baseArchetype": "{a}"}}"#),
            None => format!(r#"{{"rigName": "{name}"}}"#),
        };
        fs::write(&rig_file, body).unwrap();
        rig_file
    }

    #[test]
    fn resolves_chain_depth_first_ancestor_order() {
        let tmp = tempfile::tempdir().unwrap();
        let archetypes_root = tmp.path().join("archetypes");
        write_rig(&archetypes_root.join("c"), "c", None);
        write_rig(&archetypes_root.join("b"), "b", Some("c"));

        let rig_dir = tmp.path().join("rig_a");
        let rig_file = write_rig(&rig_dir, "a", Some("b"));

        let resolver = ArchetypeResolver::new(vec![archetypes_root]);
        let chain = resolver.resolve_chain(&rig_file).unwrap();

        let names: Vec<_> = chain
            .iter()
            .map(|n| n.data.rig_name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(chain.iter().map(|n| n.depth).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn missing_archetype_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let rig_dir = tmp.path().join("rig_a");
        let rig_file = write_rig(&rig_dir, "a", Some("ghost"));

        let resolver = ArchetypeResolver::new(vec![tmp.path().join("archetypes")]);
        let err = resolver.resolve_chain(&rig_file).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn list_available_finds_archetype_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let archetypes_root = tmp.path().join("archetypes");
        write_rig(&archetypes_root.join("biped"), "biped", None);
        write_rig(&archetypes_root.join("quadruped"), "quadruped", None);

        let resolver = ArchetypeResolver::new(vec![archetypes_root]);
        let mut names = resolver.list_available().unwrap();
        names.sort();
        assert_eq!(names, vec!["biped".to_string(), "quadruped".to_string()]);
    }
}

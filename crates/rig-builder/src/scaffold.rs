//! Archetype scaffolding operations (§4.4 "Supplemented: archetype scaffolding operations").
//!
//! One-shot filesystem helpers a CLI exposes as separate subcommands; they never touch the phase
//! state machine and are not part of [`crate::Builder::run`].

use rig_config::{ArchetypeResolver, RigFileData, StringOrList};
use rig_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Copy `source_environment`'s directory tree to `target_environment`, rename its `.rig` file to
/// `{rig_name}.rig`, and set the copied file's `rigName` key.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `source_environment` has no `.rig` file, or an I/O error
/// from the copy/rename.
pub fn create_rig_environment(
    source_environment: &Path,
    target_environment: &Path,
    rig_name: &str,
) -> Result<PathBuf> {
    let source_rig_file = find_rig_file(source_environment)?;
    copy_dir_all(source_environment, target_environment)?;

    let file_name = source_rig_file
        .file_name()
        .ok_or_else(|| Error::configuration(format!("{source_rig_file:?} has no file name")))?;
    let copied_rig_file = target_environment.join(file_name);
    let new_rig_file = rename_rig_file(&copied_rig_file, rig_name)?;

    let mut data = RigFileData::load(&new_rig_file)?;
    data.rig_name = Some(rig_name.to_string());
    data.save(&new_rig_file)?;
    Ok(new_rig_file)
}

/// Copy a registered archetype's directory tree to `new_environment`, point the new rig file's
/// `baseArchetype` back at `archetype`, and clear its own script lists (the new rig inherits the
/// archetype's scripts rather than duplicating them).
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `archetype` cannot be located, or an I/O error from the
/// copy/rename.
pub fn new_rig_environment_from_archetype(
    new_environment: &Path,
    archetype: &str,
    rig_name: Option<&str>,
    resolver: &ArchetypeResolver,
) -> Result<PathBuf> {
    let archetype_rig_file = resolver.find_rig_file(archetype)?;
    let archetype_dir = archetype_rig_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    copy_dir_all(&archetype_dir, new_environment)?;

    let rig_name = rig_name.unwrap_or(archetype);
    let file_name = archetype_rig_file
        .file_name()
        .ok_or_else(|| Error::configuration(format!("{archetype_rig_file:?} has no file name")))?;
    let copied_rig_file = new_environment.join(file_name);
    let new_rig_file = rename_rig_file(&copied_rig_file, rig_name)?;

    let mut data = RigFileData::load(&new_rig_file)?;
    data.rig_name = Some(rig_name.to_string());
    data.base_archetype = StringOrList(vec![archetype.to_string()]);
    data.pre_script = StringOrList::default();
    data.post_script = StringOrList::default();
    data.pub_script = StringOrList::default();
    data.save(&new_rig_file)?;
    Ok(new_rig_file)
}

fn rename_rig_file(copied_rig_file: &Path, rig_name: &str) -> Result<PathBuf> {
    let parent = copied_rig_file.parent().unwrap_or_else(|| Path::new("."));
    let target = parent.join(format!("{rig_name}.rig"));
    if target != copied_rig_file {
        std::fs::rename(copied_rig_file, &target)?;
    }
    Ok(target)
}

/// Find the single `.rig` file directly inside `dir`.
fn find_rig_file(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::configuration(format!("cannot read {dir:?}: {e}")))?;
    for entry in entries {
        let path = entry
            .map_err(|e| Error::configuration(format!("cannot read entry in {dir:?}: {e}")))?
            .path();
        if path.extension().and_then(|e| e.to_str()) == Some("rig") {
            return Ok(path);
        }
    }
    Err(Error::configuration(format!("no .rig file found in {dir:?}")))
}

fn copy_dir_all(source: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &destination)?;
        } else {
            std::fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_rig(dir: &Path, name: &str, body: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let rig_file = dir.join(format!("{name}.rig"));
        fs::write(&rig_file, body).unwrap();
        rig_file
    }

    #[test]
    fn create_rig_environment_copies_renames_and_relabels() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source_env");
        write_rig(&source, "template", r#"{"rigName": "template", "skeletonPos": "data/joints.json"}"#);
        fs::create_dir_all(source.join("data")).unwrap();
        fs::write(source.join("data").join("joints.json"), "{}").unwrap();

        let target = tmp.path().join("new_hero");
        let new_rig_file = create_rig_environment(&source, &target, "hero").unwrap();

        assert_eq!(new_rig_file, target.join("hero.rig"));
        assert!(target.join("data").join("joints.json").exists());
        let data = RigFileData::load(&new_rig_file).unwrap();
        assert_eq!(data.rig_name.as_deref(), Some("hero"));
    }

    #[test]
    fn new_rig_environment_from_archetype_points_back_and_clears_scripts() {
        let tmp = tempfile::tempdir().unwrap();
        let archetypes_root = tmp.path().join("archetypes");
        write_rig(
            &archetypes_root.join("biped"),
            "biped",
            r#"{"rigName": "biped", "preScript": "setup.py"}"#,
        );

        let resolver = ArchetypeResolver::new(vec![archetypes_root]);
        let new_environment = tmp.path().join("hero_env");
        let new_rig_file =
            new_rig_environment_from_archetype(&new_environment, "biped", Some("hero"), &resolver)
                .unwrap();

        let data = RigFileData::load(&new_rig_file).unwrap();
        assert_eq!(data.rig_name.as_deref(), Some("hero"));
        assert_eq!(data.base_archetype.0, vec!["biped".to_string()]);
        assert!(data.pre_script.is_empty());
    }

    #[test]
    fn missing_rig_file_in_source_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("empty_env");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("target_env");

        let err = create_rig_environment(&source, &target, "hero").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}

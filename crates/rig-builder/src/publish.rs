//! Publishing the assembled rig to disk (§4.4 `publish`, "Supplemented: archetype scaffolding
//! operations").

use rig_core::{Error, Result, SceneHost};
use std::path::{Path, PathBuf};

/// Save the current scene as `output_dir/asset_name.file_type`, or, when `versioning` is set,
/// as the next unused `output_dir/versions/asset_name_vNNN.file_type`.
///
/// # Errors
///
/// Returns [`Error::Publish`] if `output_dir` cannot be created, or the host's save error.
pub fn publish(
    host: &dyn SceneHost,
    rig_name: &str,
    output_dir: &Path,
    asset_name: Option<&str>,
    file_type: &str,
    versioning: bool,
) -> Result<PathBuf> {
    let asset_name = asset_name.unwrap_or(rig_name);
    std::fs::create_dir_all(output_dir)
        .map_err(|e| Error::publish(format!("cannot create output directory {output_dir:?}: {e}")))?;

    let target = if versioning {
        next_version_path(output_dir, asset_name, file_type)?
    } else {
        output_dir.join(format!("{asset_name}.{file_type}"))
    };

    host.save_scene(&target, file_type)
        .map_err(|e| Error::publish(format!("failed to save {target:?}: {e}")))?;
    tracing::info!(path = %target.display(), "published rig");
    Ok(target)
}

fn next_version_path(output_dir: &Path, asset_name: &str, file_type: &str) -> Result<PathBuf> {
    let versions_dir = output_dir.join("versions");
    std::fs::create_dir_all(&versions_dir)
        .map_err(|e| Error::publish(format!("cannot create versions directory: {e}")))?;

    let mut index: u32 = 0;
    loop {
        let candidate = versions_dir.join(format!("{asset_name}_v{index:03}.{file_type}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        index = index
            .checked_add(1)
            .ok_or_else(|| Error::publish("exhausted version numbers"))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_component::InMemorySceneHost;

    #[test]
    fn non_versioned_publish_writes_named_file() {
        let tmp = tempfile::tempdir().unwrap();
        let host = InMemorySceneHost::new();
        let path = publish(&host, "hero", tmp.path(), None, "ma", false).unwrap();
        assert_eq!(path, tmp.path().join("hero.ma"));
    }

    #[test]
    fn versioned_publish_increments_past_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("versions")).unwrap();
        std::fs::write(tmp.path().join("versions").join("hero_v000.ma"), "x").unwrap();
        std::fs::write(tmp.path().join("versions").join("hero_v001.ma"), "x").unwrap();

        let host = InMemorySceneHost::new();
        let path = publish(&host, "hero", tmp.path(), None, "ma", true).unwrap();
        assert_eq!(path, tmp.path().join("versions").join("hero_v002.ma"));
    }

    #[test]
    fn asset_name_overrides_rig_name() {
        let tmp = tempfile::tempdir().unwrap();
        let host = InMemorySceneHost::new();
        let path = publish(&host, "hero", tmp.path(), Some("hero_lod0"), "ma", false).unwrap();
        assert_eq!(path, tmp.path().join("hero_lod0.ma"));
    }
}

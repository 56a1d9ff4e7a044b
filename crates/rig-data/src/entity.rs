//! The Data Entity contract (§3.4, §9).

use rig_core::{Error, Handle, Result, SceneHost};
use serde_json::{Map, Value};
use std::path::Path;

/// The tag compatible with any handler: a file declaring this `dataType` carries no
/// kind-specific payload and passes the filter step of the merge engine for every kind (§3.4,
/// §4.2).
pub const ABSTRACT_DATA_TAG: &str = "AbstractData";

/// Where a data kind's on-disk payload lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLayout {
    /// One JSON document holding every entity.
    SingleFile,
    /// A directory holding one file per entity, named `<entityKey>.<extension>` (§4.2, §6.2).
    DirectoryPerEntity {
        /// File extension (without the leading dot) multi-file kinds use, e.g. `"json"`.
        extension: String,
    },
}

/// The on-disk shape every data file shares (§6.2): a `dataType` tag and a `data` map.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DataFileDocument {
    /// The kind tag (§3.4).
    #[serde(rename = "dataType")]
    pub data_type: String,
    /// Entity key → opaque payload.
    pub data: Map<String, Value>,
}

/// Read a file's declared `dataType` and entity keys without committing to a concrete handler.
/// Used by the merge engine's filter step (§4.2 step 2–3) to sniff files before dispatching to a
/// registered handler.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the file is not a well-formed data document, or
/// [`Error::Io`] if it cannot be read.
pub fn sniff(path: &Path) -> Result<DataFileDocument> {
    let content = std::fs::read_to_string(path)?;
    let doc: DataFileDocument = serde_json::from_str(&content)?;
    Ok(doc)
}

/// A self-contained rigging data kind: joints, guides, control shapes, skin weights, deformer
/// setups, pose-space deformers (§3.4).
///
/// Kind-specific payloads are opaque `serde_json::Value`s (§9) — the core never interprets their
/// contents; it only needs the entity-key → payload mapping, a kind tag for self-description, and
/// the merge/difference operators the layered save algorithm composes plans with.
pub trait DataEntity: std::fmt::Debug {
    /// This handler's kind tag, written at the top of every file it produces.
    fn tag(&self) -> &str;

    /// How this kind's files are laid out on disk.
    fn storage_layout(&self) -> StorageLayout {
        StorageLayout::SingleFile
    }

    /// Capture one entity's current scene state into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be queried for `entity`.
    fn gather_data(&mut self, entity: &Handle, host: &dyn SceneHost) -> Result<()>;

    /// Write stored state for the given keys back onto the scene. Per-key failures are logged and
    /// skipped rather than propagated (§4.2 "Loading").
    fn apply_data(&self, keys: &[String], host: &dyn SceneHost);

    /// Read a single-file document from `path`, validating its declared `dataType`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataFileTypeMismatch`] if the file's tag is neither this handler's tag
    /// nor `"AbstractData"`, or an I/O/serialization error.
    fn read(&mut self, path: &Path) -> Result<()> {
        let doc = sniff(path)?;
        if doc.data_type != self.tag() && doc.data_type != ABSTRACT_DATA_TAG {
            return Err(Error::data_file_type_mismatch(
                path.to_string_lossy(),
                doc.data_type,
                self.tag(),
            ));
        }
        self.set_data(doc.data);
        Ok(())
    }

    /// Write a single-file document to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    fn write(&self, path: &Path) -> Result<()> {
        let doc = DataFileDocument {
            data_type: self.tag().to_string(),
            data: self.get_data().clone(),
        };
        let content = serde_json::to_string_pretty(&doc)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Every entity key currently stored.
    fn get_keys(&self) -> Vec<String> {
        self.get_data().keys().cloned().collect()
    }

    /// The full entity → payload map.
    fn get_data(&self) -> &Map<String, Value>;

    /// Replace the entity → payload map wholesale.
    fn set_data(&mut self, data: Map<String, Value>);

    /// Union `other`'s entries into `self`, with `other` overriding on key collision (§3.4's
    /// merge operator).
    fn merge_from(&mut self, other: &dyn DataEntity) {
        let mut data = self.get_data().clone();
        for (k, v) in other.get_data() {
            data.insert(k.clone(), v.clone());
        }
        self.set_data(data);
    }

    /// Remove the given keys (§3.4's difference operator).
    fn remove_keys(&mut self, keys: &[String]) {
        let mut data = self.get_data().clone();
        for k in keys {
            data.remove(k);
        }
        self.set_data(data);
    }
}

/// A generic handler for a named data kind, backed by an opaque JSON map.
///
/// Concrete rigging payloads (joint transforms, control-curve shapes, skin-weight maps, ...) are
/// opaque to the core by design (§9's "duck-typed data handlers" note); this single type serves
/// every kind named in §3.1 by carrying its tag as data rather than as a distinct Rust type. Its
/// `gather_data`/`apply_data` read and write a single `"data"` attribute through [`SceneHost`] —
/// the generic reference behavior a real DCC-specific handler overrides with kind-aware capture
/// logic (out of scope per §1).
#[derive(Debug, Clone)]
pub struct GenericDataEntity {
    tag: String,
    layout: StorageLayout,
    data: Map<String, Value>,
}

impl GenericDataEntity {
    /// Build an empty handler for the given kind tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            layout: StorageLayout::SingleFile,
            data: Map::new(),
        }
    }

    /// Build an empty handler for a directory-backed, multi-file kind (§4.2 "Supplemented").
    #[must_use]
    pub fn new_directory(tag: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            layout: StorageLayout::DirectoryPerEntity {
                extension: extension.into(),
            },
            data: Map::new(),
        }
    }
}

impl DataEntity for GenericDataEntity {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn storage_layout(&self) -> StorageLayout {
        self.layout.clone()
    }

    fn gather_data(&mut self, entity: &Handle, host: &dyn SceneHost) -> Result<()> {
        let payload = host.get_attr(entity, "data")?.unwrap_or(Value::Null);
        self.data.insert(entity.as_str().to_string(), payload);
        Ok(())
    }

    fn apply_data(&self, keys: &[String], host: &dyn SceneHost) {
        for key in keys {
            let Some(payload) = self.data.get(key) else {
                continue;
            };
            let handle = Handle::new(key.clone());
            if let Err(e) = host.set_attr(&handle, "data", payload) {
                tracing::warn!(entity = %key, error = %e, "failed to apply data to entity, skipping");
            }
        }
    }

    fn get_data(&self) -> &Map<String, Value> {
        &self.data
    }

    fn set_data(&mut self, data: Map<String, Value>) {
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_rejects_mismatched_data_type() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("joints.json");
        std::fs::write(&path, r#"{"dataType": "GuideData", "data": {}}"#).unwrap();

        let mut handler = GenericDataEntity::new("JointData");
        let err = handler.read(&path).unwrap_err();
        assert!(matches!(err, Error::DataFileTypeMismatch { .. }));
    }

    #[test]
    fn read_accepts_abstract_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("joints.json");
        std::fs::write(
            &path,
            r#"{"dataType": "AbstractData", "data": {"hip": 1}}"#,
        )
        .unwrap();

        let mut handler = GenericDataEntity::new("JointData");
        handler.read(&path).unwrap();
        assert_eq!(handler.get_keys(), vec!["hip".to_string()]);
    }

    #[test]
    fn merge_overrides_on_collision() {
        let mut a = GenericDataEntity::new("JointData");
        a.set_data(serde_json::from_str(r#"{"hip": 1, "spine": 1}"#).unwrap());
        let mut b = GenericDataEntity::new("JointData");
        b.set_data(serde_json::from_str(r#"{"spine": 2, "head": 1}"#).unwrap());

        a.merge_from(&b);
        assert_eq!(a.get_data().get("hip").unwrap().as_i64(), Some(1));
        assert_eq!(a.get_data().get("spine").unwrap().as_i64(), Some(2));
        assert_eq!(a.get_data().get("head").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn remove_keys_drops_entries() {
        let mut a = GenericDataEntity::new("JointData");
        a.set_data(serde_json::from_str(r#"{"hip": 1, "spine": 1}"#).unwrap());
        a.remove_keys(&["hip".to_string()]);
        assert_eq!(a.get_keys(), vec!["spine".to_string()]);
    }
}

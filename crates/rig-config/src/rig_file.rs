//! The rig configuration file model (§3.1, §6.1 of the design).

use rig_core::{Error, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// A path-list value that serializes as either a bare string or an array of strings.
///
/// Per §6.1: "a single-string value is coerced to a single-element array."
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringOrList(pub Vec<String>);

impl StringOrList {
    /// True if the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the entries in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl Serialize for StringOrList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StringOrList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct StringOrListVisitor;

        impl<'de> Visitor<'de> for StringOrListVisitor {
            type Value = StringOrList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or a list of strings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(StringOrList(vec![v.to_string()]))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
                Ok(StringOrList(vec![v]))
            }

            fn visit_seq<A: de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut out = Vec::new();
                while let Some(entry) = seq.next_element::<String>()? {
                    out.push(entry);
                }
                Ok(StringOrList(out))
            }
        }

        deserializer.deserialize_any(StringOrListVisitor)
    }
}

/// The recognized contents of a rig configuration file (§3.1).
///
/// Unknown keys round-trip through `extra` untouched, per §6.1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigFileData {
    /// Rig identifier.
    #[serde(default)]
    pub rig_name: Option<String>,

    /// Directory the rig's relative paths resolve against, itself resolved relative to the rig
    /// file's own directory. Defaults to the rig file's directory when absent.
    #[serde(default)]
    pub rig_env: Option<String>,

    /// Archetype(s) this rig inherits from.
    #[serde(default)]
    pub base_archetype: StringOrList,

    #[serde(default)]
    pub pre_script: StringOrList,
    #[serde(default)]
    pub post_script: StringOrList,
    #[serde(default)]
    pub pub_script: StringOrList,

    #[serde(default)]
    pub model_file: StringOrList,
    #[serde(default)]
    pub skeleton_pos: StringOrList,
    #[serde(default)]
    pub guides: StringOrList,
    #[serde(default)]
    pub components: StringOrList,
    #[serde(default)]
    pub control_shapes: StringOrList,
    #[serde(default)]
    pub psd: StringOrList,
    #[serde(default)]
    pub skin_weights: StringOrList,
    #[serde(default)]
    pub deform_layers: StringOrList,
    #[serde(default)]
    pub deformers: StringOrList,
    #[serde(default)]
    pub shapes: StringOrList,

    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub output_file_type: Option<String>,
    #[serde(default)]
    pub output_file_suffix: Option<String>,

    /// Unrecognized keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RigFileData {
    /// Parse a rig file from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the content is not valid JSON or not an object.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::configuration(format!("malformed rig file: {e}")))
    }

    /// Load and parse a rig file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file does not exist or fails to parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("cannot read rig file {path:?}: {e}")))?;
        Self::parse(&content)
    }

    /// Serialize back to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if serialization fails (never expected in practice).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Write this rig file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_json()?;
        std::fs::write(path, content)
            .map_err(|e| Error::configuration(format!("cannot write rig file {path:?}: {e}")))
    }

    /// The directory this rig's relative paths resolve against.
    ///
    /// Per §3.1: `rigEnv`, resolved relative to `rig_file_dir` if relative; defaults to
    /// `rig_file_dir` when absent.
    #[must_use]
    pub fn env_dir(&self, rig_file_dir: &Path) -> PathBuf {
        match &self.rig_env {
            Some(env) => resolve_path(rig_file_dir, env),
            None => rig_file_dir.to_path_buf(),
        }
    }

    /// Resolve one of this rig's path-list fields to absolute paths against `env_dir`.
    #[must_use]
    pub fn resolve_list(list: &StringOrList, env_dir: &Path) -> Vec<PathBuf> {
        list.iter().map(|p| resolve_path(env_dir, p)).collect()
    }
}

/// Resolve `value` against `base` per §3.1/§6.1: an absolute path short-circuits resolution.
#[must_use]
pub fn resolve_path(base: &Path, value: &str) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_coerces_to_single_element_list() {
        let data = RigFileData::parse(r#"{"preScript": "scripts/pre.py"}"#).unwrap();
        assert_eq!(data.pre_script.0, vec!["scripts/pre.py".to_string()]);
    }

    #[test]
    fn list_stays_a_list() {
        let data = RigFileData::parse(r#"{"preScript": ["a.py", "b.py"]}"#).unwrap();
        assert_eq!(data.pre_script.0, vec!["a.py".to_string(), "b.py".to_string()]);
    }

    #[test]
    fn unknown_keys_round_trip() {
        let data = RigFileData::parse(r#"{"rigName": "hero", "customTool": {"x": 1}}"#).unwrap();
        assert_eq!(data.rig_name.as_deref(), Some("hero"));
        assert!(data.extra.contains_key("customTool"));
        let json = data.to_json().unwrap();
        assert!(json.contains("customTool"));
    }

    #[test]
    fn absolute_path_short_circuits() {
        let resolved = resolve_path(Path::new("/rig/env"), "/abs/joints.json");
        assert_eq!(resolved, PathBuf::from("/abs/joints.json"));
    }

    #[test]
    fn relative_path_joins_base() {
        let resolved = resolve_path(Path::new("/rig/env"), "data/joints.json");
        assert_eq!(resolved, PathBuf::from("/rig/env/data/joints.json"));
    }
}

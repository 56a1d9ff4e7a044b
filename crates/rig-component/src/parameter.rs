//! Component parameters and the reversible metaNode channel (§3.2, §4.3, §9).

use std::collections::BTreeMap;

/// The recognized parameter value shapes (§3.2).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "dataType", content = "value", rename_all = "camelCase")]
pub enum ParameterValue {
    /// `string`.
    String(String),
    /// `int`.
    Int(i64),
    /// `float`.
    Float(f64),
    /// `bool`.
    Bool(bool),
    /// `list` — an ordered list of opaque values.
    List(Vec<serde_json::Value>),
    /// `dict` — an opaque JSON object.
    Dict(serde_json::Map<String, serde_json::Value>),
    /// `selectionList` — an ordered list of scene-entity identifiers.
    SelectionList(Vec<String>),
}

impl ParameterValue {
    /// The `dataType` tag this value serializes under (§3.2).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::SelectionList(_) => "selectionList",
        }
    }
}

/// A component's reversible metaNode (§4.3 "Parameter persistence").
///
/// In the host DCC this is a scene node carrying typed attributes; the core only needs a
/// key/value store with `define`-then-`set` semantics, so it is abstracted behind this trait.
/// `define` is idempotent: the first call for a name creates the entry, every later call updates
/// its value (the attribute's `dataType` does not change across a component's lifetime).
pub trait ParameterStore: std::fmt::Debug {
    /// Declare `name` if absent, or update its value if already declared.
    fn define(&mut self, name: &str, value: ParameterValue);

    /// Read the current value of `name`, if declared.
    fn get(&self, name: &str) -> Option<&ParameterValue>;

    /// Update the value of an already-declared parameter.
    ///
    /// Unlike `define`, this is available to component implementations during any phase, not
    /// just INITIALIZE (§9 Open Questions) — a component may cache computed defaults during
    /// BUILD. The Builder itself never calls this.
    fn set(&mut self, name: &str, value: ParameterValue);

    /// Every declared parameter name, in declaration order.
    fn names(&self) -> Vec<String>;

    /// Every declared parameter, name to value.
    fn all(&self) -> Vec<(String, ParameterValue)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(&name).map(|v| (name.clone(), v.clone())))
            .collect()
    }
}

/// The reference in-memory [`ParameterStore`] this crate tests against (§9).
#[derive(Debug, Default, Clone)]
pub struct InMemoryParameterStore {
    order: Vec<String>,
    values: BTreeMap<String, ParameterValue>,
}

impl InMemoryParameterStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn define(&mut self, name: &str, value: ParameterValue) {
        if !self.values.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.values.insert(name.to_string(), value);
    }

    fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    fn set(&mut self, name: &str, value: ParameterValue) {
        self.define(name, value);
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_set_preserves_insertion_order() {
        let mut store = InMemoryParameterStore::new();
        store.define("a", ParameterValue::Int(1));
        store.define("b", ParameterValue::String("x".into()));
        store.set("a", ParameterValue::Int(2));
        assert_eq!(store.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.get("a"), Some(&ParameterValue::Int(2)));
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryParameterStore::new();
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn type_name_matches_variant() {
        assert_eq!(ParameterValue::Bool(true).type_name(), "bool");
        assert_eq!(
            ParameterValue::SelectionList(vec!["a".into()]).type_name(),
            "selectionList"
        );
    }
}

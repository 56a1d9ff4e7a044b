//! The DataModule Registry (§4.1).

use crate::entity::{GenericDataEntity, ABSTRACT_DATA_TAG};
use crate::DataEntity;
use dashmap::DashMap;
use rig_core::{Error, Result};
use std::sync::Arc;

/// A factory that produces a fresh, empty handler instance for one data kind.
pub type DataEntityFactory = Arc<dyn Fn() -> Box<dyn DataEntity> + Send + Sync>;

/// Discovers concrete data handlers and exposes them by tag (§4.1).
///
/// The original tool locates handlers by walking a directory of source files and importing every
/// class descending from the abstract data handler. A statically compiled rewrite has no
/// equivalent of that reflective import step (§9 "Dynamic component discovery" applies equally
/// here): handlers register themselves explicitly, once, and the registry is from then on a
/// process-wide read-only lookup table — mirroring the `DashMap`-backed registry the teacher crate
/// uses for its own plugin table.
#[derive(Debug, Default)]
pub struct DataModuleRegistry {
    handlers: DashMap<String, DataEntityFactory>,
}

impl DataModuleRegistry {
    /// An empty registry with no handlers registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// A registry pre-populated with the standard rigging data kinds named in §3.1: joints,
    /// guides, control shapes, pose readers, skin weights, deform layers, deformers, shapes, and
    /// the universally compatible `AbstractData`.
    #[must_use]
    pub fn with_standard_kinds() -> Self {
        let registry = Self::new();
        registry.register("AbstractData", || Box::new(GenericDataEntity::new(ABSTRACT_DATA_TAG)));
        registry.register("JointData", || Box::new(GenericDataEntity::new("JointData")));
        registry.register("GuideData", || Box::new(GenericDataEntity::new("GuideData")));
        registry.register("ControlShapeData", || {
            Box::new(GenericDataEntity::new("ControlShapeData"))
        });
        registry.register("PoseReaderData", || {
            Box::new(GenericDataEntity::new("PoseReaderData"))
        });
        registry.register("SkinWeightsData", || {
            Box::new(GenericDataEntity::new_directory("SkinWeightsData", "json"))
        });
        registry.register("DeformLayerData", || {
            Box::new(GenericDataEntity::new("DeformLayerData"))
        });
        registry.register("DeformerData", || {
            Box::new(GenericDataEntity::new("DeformerData"))
        });
        registry.register("ShapesData", || Box::new(GenericDataEntity::new("ShapesData")));
        registry
    }

    /// Register a handler factory under `tag`. Scanning is conceptually flat and name collisions
    /// are last-wins (§4.1), so a later `register` call for the same tag silently replaces the
    /// earlier one.
    pub fn register<F>(&self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn DataEntity> + Send + Sync + 'static,
    {
        self.handlers.insert(tag.into(), Arc::new(factory));
    }

    /// Produce a fresh, empty handler instance for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDataType`] if `tag` is not registered.
    pub fn new_instance(&self, tag: &str) -> Result<Box<dyn DataEntity>> {
        self.handlers
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| Error::unknown_data_type(tag))
    }

    /// Whether `tag` has a registered handler.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Every registered tag, in no particular order.
    #[must_use]
    pub fn list_handlers(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_errors() {
        let registry = DataModuleRegistry::with_standard_kinds();
        let err = registry.new_instance("FooBar").unwrap_err();
        assert!(matches!(err, Error::UnknownDataType(tag) if tag == "FooBar"));
    }

    #[test]
    fn known_tag_produces_empty_handler() {
        let registry = DataModuleRegistry::with_standard_kinds();
        let handler = registry.new_instance("JointData").unwrap();
        assert_eq!(handler.tag(), "JointData");
        assert!(handler.get_keys().is_empty());
    }

    #[test]
    fn re_registering_a_tag_is_last_wins() {
        let registry = DataModuleRegistry::new();
        registry.register("X", || Box::new(GenericDataEntity::new("first")));
        registry.register("X", || Box::new(GenericDataEntity::new("second")));
        assert_eq!(registry.new_instance("X").unwrap().tag(), "second");
    }
}

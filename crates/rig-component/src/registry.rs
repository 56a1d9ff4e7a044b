//! The Component registry (§4.4 "Component discovery").
//!
//! Structurally identical to the DataModule Registry: concrete component kinds are out of scope
//! for this core (§1), so this registry holds no standard entries — callers register every
//! `module.ClassName` tag their own component implementations expose.

use crate::component::ComponentBehavior;
use dashmap::DashMap;
use rig_core::{Error, Result};
use std::sync::Arc;

/// A factory producing a fresh behavior instance for one component kind.
pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn ComponentBehavior> + Send + Sync>;

/// Discovers concrete component behaviors and exposes them by `module.ClassName` tag (§4.4).
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    handlers: DashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register a behavior factory under its `module.ClassName` tag. Last registration for a tag
    /// wins, matching the flat, collision-tolerant scan §4.1/§4.4 describe for the source tool.
    pub fn register<F>(&self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ComponentBehavior> + Send + Sync + 'static,
    {
        self.handlers.insert(tag.into(), Arc::new(factory));
    }

    /// Produce a fresh behavior instance for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDataType`] if `tag` is not registered. Component kinds share the
    /// same unregistered-tag taxonomy entry as data kinds (§7); there is no separate
    /// `UnknownComponentType` variant because both describe the same failure shape: a lookup
    /// into a tag→factory table missed.
    pub fn new_instance(&self, tag: &str) -> Result<Box<dyn ComponentBehavior>> {
        self.handlers
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| Error::unknown_data_type(tag))
    }

    /// Whether `tag` has a registered behavior.
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
    use crate::component::NoopBehavior;

    #[test]
    fn unknown_tag_errors() {
        let registry = ComponentRegistry::new();
        assert!(registry.new_instance("spine.Spine").is_err());
    }

    #[test]
    fn registered_tag_produces_instances() {
        let registry = ComponentRegistry::new();
        registry.register("spine.Spine", || Box::new(NoopBehavior));
        assert!(registry.contains("spine.Spine"));
        let _behavior = registry.new_instance("spine.Spine").unwrap();
    }

    #[test]
    fn re_registering_a_tag_is_last_wins() {
        let registry = ComponentRegistry::new();
        registry.register("x.X", || Box::new(NoopBehavior));
        registry.register("x.X", || Box::new(NoopBehavior));
        assert_eq!(registry.list_handlers(), vec!["x.X".to_string()]);
    }
}

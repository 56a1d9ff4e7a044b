//! The Component base contract and its driving state machine (§3.2, §3.3, §4.3).

use crate::parameter::{InMemoryParameterStore, ParameterStore, ParameterValue};
use crate::phase::Phase;
use rig_core::{Error, Handle, Result, SceneHost};
use std::collections::BTreeMap;

/// The phase-specific behavior of one concrete component kind (§9's replacement for the source's
/// reflective subclassing). Every method defaults to a no-op so a component that has nothing to
/// do in a given phase need not override it.
pub trait ComponentBehavior: std::fmt::Debug {
    /// INITIALIZE: bind parameters, declare sub-components. The container already exists and is
    /// available via `ctx.container` by the time this is called.
    fn on_initialize(&mut self, ctx: &mut ComponentContext<'_>, host: &dyn SceneHost) -> Result<()> {
        let _ = (ctx, host);
        Ok(())
    }

    /// GUIDE: create editable guide transforms.
    fn on_guide(&mut self, ctx: &mut ComponentContext<'_>, host: &dyn SceneHost) -> Result<()> {
        let _ = (ctx, host);
        Ok(())
    }

    /// BUILD: create the deformation- and control-graph.
    fn on_build(&mut self, ctx: &mut ComponentContext<'_>, host: &dyn SceneHost) -> Result<()> {
        let _ = (ctx, host);
        Ok(())
    }

    /// CONNECT: hook external inputs to other components' already-built outputs. `rig_parent`
    /// is the already-resolved handle for `ctx.rig_parent`, or `None` if it did not resolve
    /// (§4.3 "rigParent semantics") — wiring the container under it, if present, is this method's
    /// responsibility so kinds that need a different hookup than "parent the container" may
    /// override it.
    fn on_connect(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        host: &dyn SceneHost,
        rig_parent: Option<&Handle>,
    ) -> Result<()> {
        if let (Some(container), Some(parent)) = (ctx.container, rig_parent) {
            host.parent(&container.clone(), parent)?;
        }
        Ok(())
    }

    /// FINALIZE: cosmetic lock-down, attribute promotion, scaffolding cleanup.
    fn on_finalize(&mut self, ctx: &mut ComponentContext<'_>, host: &dyn SceneHost) -> Result<()> {
        let _ = (ctx, host);
        Ok(())
    }

    /// OPTIMIZE: optional performance pass.
    fn on_optimize(&mut self, ctx: &mut ComponentContext<'_>, host: &dyn SceneHost) -> Result<()> {
        let _ = (ctx, host);
        Ok(())
    }
}

/// A no-op behavior for kinds (or tests) that need no custom phase logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBehavior;

impl ComponentBehavior for NoopBehavior {}

/// The view a [`ComponentBehavior`] gets into its owning [`Component`] during a phase call.
///
/// Borrows the component's mutable state (parameter store, sub-component list) without exposing
/// the phase field itself, which only [`Component`]'s own entry points may advance.
#[derive(Debug)]
pub struct ComponentContext<'a> {
    /// This component's unique name (§3.2).
    pub name: &'a str,
    /// This component's `module.ClassName` tag.
    pub component_type: &'a str,
    /// Ordered opaque entity identifiers this component operates on.
    pub input: &'a [String],
    /// Opaque parent-hook identifier, unresolved.
    pub rig_parent: Option<&'a str>,
    /// This component's scene container, once INITIALIZE has run.
    pub container: Option<&'a Handle>,
    /// The reversible parameter/metaNode channel (§4.3).
    pub params: &'a mut dyn ParameterStore,
    /// Further components this one declares during INITIALIZE (§4.3 "Sub-components").
    pub sub_components: &'a mut Vec<Component>,
}

/// A self-contained rigging unit advancing through the fixed phase state machine (§3.2–§3.3,
/// §4.3).
#[derive(Debug)]
pub struct Component {
    name: String,
    component_type: String,
    input: Vec<String>,
    rig_parent: Option<String>,
    component_tag: Option<String>,
    phase: Phase,
    container: Option<Handle>,
    params: Box<dyn ParameterStore>,
    sub_components: Vec<Component>,
    behavior: Box<dyn ComponentBehavior>,
}

impl Component {
    /// Build a component from its serialized form (§3.2), not yet advanced past `Unbuilt`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        component_type: impl Into<String>,
        input: Vec<String>,
        rig_parent: Option<String>,
        component_tag: Option<String>,
        parameters: BTreeMap<String, ParameterValue>,
        behavior: Box<dyn ComponentBehavior>,
    ) -> Self {
        let mut params = InMemoryParameterStore::new();
        for (key, value) in parameters {
            params.define(&key, value);
        }
        Self {
            name: name.into(),
            component_type: component_type.into(),
            input,
            rig_parent,
            component_tag,
            phase: Phase::Unbuilt,
            container: None,
            params: Box::new(params),
            sub_components: Vec::new(),
            behavior,
        }
    }

    /// This component's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This component's `module.ClassName` tag.
    #[must_use]
    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    /// The ordered opaque entity identifiers this component operates on (§3.2 `input`).
    #[must_use]
    pub fn input(&self) -> &[String] {
        &self.input
    }

    /// The opaque parent-hook identifier, unresolved.
    #[must_use]
    pub fn rig_parent(&self) -> Option<&str> {
        self.rig_parent.as_deref()
    }

    /// The grouping tag, if any (§3.2). Used by UI tools to hide sub-components from the
    /// top-level component list.
    #[must_use]
    pub fn component_tag(&self) -> Option<&str> {
        self.component_tag.as_deref()
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// This component's scene container, once INITIALIZE has run.
    #[must_use]
    pub fn container(&self) -> Option<&Handle> {
        self.container.as_ref()
    }

    /// Sub-components declared during INITIALIZE (§4.3 "Sub-components").
    #[must_use]
    pub fn sub_components(&self) -> &[Component] {
        &self.sub_components
    }

    /// Mutable access to declared sub-components, so the Builder can drive them through the same
    /// phases.
    pub fn sub_components_mut(&mut self) -> &mut Vec<Component> {
        &mut self.sub_components
    }

    /// Current parameter values (§4.3 "Parameter persistence" — the metaNode is the source of
    /// truth on re-entry).
    #[must_use]
    pub fn parameters(&self) -> Vec<(String, ParameterValue)> {
        self.params.all()
    }

    fn context(&mut self) -> ComponentContext<'_> {
        ComponentContext {
            name: &self.name,
            component_type: &self.component_type,
            input: &self.input,
            rig_parent: self.rig_parent.as_deref(),
            container: self.container.as_ref(),
            params: self.params.as_mut(),
            sub_components: &mut self.sub_components,
        }
    }

    fn phase_error(&self, phase: Phase, source: Error) -> Error {
        Error::component_phase(self.name.clone(), phase.name(), source)
    }

    /// INITIALIZE (§4.3). Reserves the container, binds parameters, declares sub-components. A
    /// no-op unless `phase() == Phase::Unbuilt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentInit`] if container reservation fails, or
    /// [`Error::ComponentPhase`] wrapping the behavior's error.
    pub fn initialize(&mut self, host: &dyn SceneHost) -> Result<()> {
        if self.phase != Phase::Unbuilt {
            return Ok(());
        }
        let container = host
            .create_container(&self.name)
            .map_err(|e| Error::component_init(self.name.clone(), e.to_string()))?;
        host.tag(&container, "rigComponentName", Some(&self.name))?;
        host.tag(&container, "rigComponentType", Some(&self.component_type))?;
        self.container = Some(container);

        let mut ctx = self.context();
        self.behavior
            .on_initialize(&mut ctx, host)
            .map_err(|e| self.phase_error(Phase::Initialize, e))?;
        self.phase = Phase::Initialize;
        tracing::info!(component = %self.name, phase = %Phase::Initialize, "phase complete");
        Ok(())
    }

    /// GUIDE (§4.3). A no-op unless `phase() == Phase::Initialize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentPhase`] wrapping the behavior's error.
    pub fn guide(&mut self, host: &dyn SceneHost) -> Result<()> {
        if self.phase != Phase::Initialize {
            return Ok(());
        }
        let mut ctx = self.context();
        self.behavior
            .on_guide(&mut ctx, host)
            .map_err(|e| self.phase_error(Phase::Guide, e))?;
        self.phase = Phase::Guide;
        tracing::info!(component = %self.name, phase = %Phase::Guide, "phase complete");
        Ok(())
    }

    /// BUILD (§4.3). A no-op unless `phase() == Phase::Guide`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentPhase`] wrapping the behavior's error.
    pub fn build(&mut self, host: &dyn SceneHost) -> Result<()> {
        if self.phase != Phase::Guide {
            return Ok(());
        }
        let mut ctx = self.context();
        self.behavior
            .on_build(&mut ctx, host)
            .map_err(|e| self.phase_error(Phase::Build, e))?;
        self.phase = Phase::Build;
        tracing::info!(component = %self.name, phase = %Phase::Build, "phase complete");
        Ok(())
    }

    /// CONNECT (§4.3). A no-op unless `phase() == Phase::Build`. `rig_parent_handle` is the
    /// already-resolved handle for this component's `rigParent` (resolution is the Builder's
    /// responsibility, since only it sees every component); pass `None` when it did not resolve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentPhase`] wrapping the behavior's error.
    pub fn connect(&mut self, host: &dyn SceneHost, rig_parent_handle: Option<&Handle>) -> Result<()> {
        if self.phase != Phase::Build {
            return Ok(());
        }
        let mut ctx = self.context();
        self.behavior
            .on_connect(&mut ctx, host, rig_parent_handle)
            .map_err(|e| self.phase_error(Phase::Connect, e))?;
        self.phase = Phase::Connect;
        tracing::info!(component = %self.name, phase = %Phase::Connect, "phase complete");
        Ok(())
    }

    /// FINALIZE (§4.3). A no-op unless `phase() == Phase::Connect`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentPhase`] wrapping the behavior's error.
    pub fn finalize(&mut self, host: &dyn SceneHost) -> Result<()> {
        if self.phase != Phase::Connect {
            return Ok(());
        }
        let mut ctx = self.context();
        self.behavior
            .on_finalize(&mut ctx, host)
            .map_err(|e| self.phase_error(Phase::Finalize, e))?;
        self.phase = Phase::Finalize;
        tracing::info!(component = %self.name, phase = %Phase::Finalize, "phase complete");
        Ok(())
    }

    /// OPTIMIZE (§4.3). A no-op unless `phase() == Phase::Finalize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComponentPhase`] wrapping the behavior's error.
    pub fn optimize(&mut self, host: &dyn SceneHost) -> Result<()> {
        if self.phase != Phase::Finalize {
            return Ok(());
        }
        let mut ctx = self.context();
        self.behavior
            .on_optimize(&mut ctx, host)
            .map_err(|e| self.phase_error(Phase::Optimize, e))?;
        self.phase = Phase::Optimize;
        tracing::info!(component = %self.name, phase = %Phase::Optimize, "phase complete");
        Ok(())
    }

    /// Delete this component's container and reset it to `Unbuilt` so it can be rebuilt from
    /// scratch (§4.4 `editSingleComponent`, P8 "Container isolation").
    ///
    /// # Errors
    ///
    /// Returns an error if the host fails to delete the container.
    pub fn teardown(&mut self, host: &dyn SceneHost) -> Result<()> {
        if let Some(container) = self.container.take() {
            host.delete_container(&container)?;
        }
        self.phase = Phase::Unbuilt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::InMemorySceneHost;

    #[derive(Debug, Default)]
    struct RecordingBehavior {
        calls: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
    }

    impl ComponentBehavior for RecordingBehavior {
        fn on_initialize(&mut self, _ctx: &mut ComponentContext<'_>, _host: &dyn SceneHost) -> Result<()> {
            self.calls.borrow_mut().push("initialize");
            Ok(())
        }
        fn on_guide(&mut self, _ctx: &mut ComponentContext<'_>, _host: &dyn SceneHost) -> Result<()> {
            self.calls.borrow_mut().push("guide");
            Ok(())
        }
        fn on_build(&mut self, _ctx: &mut ComponentContext<'_>, _host: &dyn SceneHost) -> Result<()> {
            self.calls.borrow_mut().push("build");
            Ok(())
        }
    }

    fn component(behavior: impl ComponentBehavior + 'static) -> Component {
        Component::new(
            "spine",
            "spine.Spine",
            vec!["spine_1".to_string()],
            None,
            None,
            BTreeMap::new(),
            Box::new(behavior),
        )
    }

    #[test]
    fn phases_advance_monotonically_and_reject_skips() {
        let host = InMemorySceneHost::new();
        let mut component = component(NoopBehavior);

        component.build(&host).unwrap();
        assert_eq!(component.phase(), Phase::Unbuilt, "build before initialize is a no-op");

        component.initialize(&host).unwrap();
        assert_eq!(component.phase(), Phase::Initialize);
        assert!(component.container().is_some());

        component.guide(&host).unwrap();
        assert_eq!(component.phase(), Phase::Guide);
    }

    #[test]
    fn re_entry_is_a_no_op() {
        let host = InMemorySceneHost::new();
        let mut component = component(NoopBehavior);
        component.initialize(&host).unwrap();
        let first_container = component.container().cloned();

        component.initialize(&host).unwrap();
        assert_eq!(component.container().cloned(), first_container);
        assert_eq!(component.phase(), Phase::Initialize);
    }

    #[test]
    fn connect_parents_container_under_resolved_rig_parent() {
        let host = InMemorySceneHost::new();
        let parent_handle = host.create_container("chest").unwrap();

        let mut component = component(NoopBehavior);
        component.initialize(&host).unwrap();
        component.guide(&host).unwrap();
        component.build(&host).unwrap();
        component.connect(&host, Some(&parent_handle)).unwrap();

        let container = component.container().unwrap().clone();
        assert_eq!(
            host.list_relatives(&container, rig_core::RelativeDirection::Parents)
                .unwrap(),
            vec![parent_handle]
        );
    }

    #[test]
    fn connect_without_resolved_parent_leaves_component_free_floating() {
        let host = InMemorySceneHost::new();
        let mut component = component(NoopBehavior);
        component.initialize(&host).unwrap();
        component.guide(&host).unwrap();
        component.build(&host).unwrap();
        component.connect(&host, None).unwrap();

        let container = component.container().unwrap().clone();
        assert!(host
            .list_relatives(&container, rig_core::RelativeDirection::Parents)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn teardown_resets_phase_and_deletes_container() {
        let host = InMemorySceneHost::new();
        let mut component = component(NoopBehavior);
        component.initialize(&host).unwrap();
        let container = component.container().unwrap().clone();

        component.teardown(&host).unwrap();
        assert_eq!(component.phase(), Phase::Unbuilt);
        assert!(component.container().is_none());
        assert!(!host.handle_exists(&container));
    }

    #[test]
    fn behavior_hooks_fire_once_per_phase_even_on_re_entry() {
        let host = InMemorySceneHost::new();
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut component = component(RecordingBehavior {
            calls: calls.clone(),
        });

        component.initialize(&host).unwrap();
        component.guide(&host).unwrap();
        component.build(&host).unwrap();
        component.guide(&host).unwrap(); // re-entry, must not re-fire on_guide

        assert_eq!(*calls.borrow(), vec!["initialize", "guide", "build"]);
    }
}

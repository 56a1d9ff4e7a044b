//! The Builder Orchestrator (§4.4).

use crate::component_file;
use crate::publish;
use crate::script_runner::ScriptRunner;
use crate::scripts::{ScriptCollector, ScriptKind};
use rig_component::{Component, ComponentRegistry};
use rig_config::{resolve_path, ArchetypeResolver, ChainNode, RigFileData, StringOrList};
use rig_core::{Error, Handle, Result, SceneHost};
use rig_data::DataModuleRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Resolves a rig configuration and drives the full build pipeline (§4.4).
///
/// Borrows the data-module and component registries and a script runner for its lifetime; owns
/// the resolved archetype chain and the live component list a `loadConfig`/`run` cycle produces.
pub struct Builder<'a> {
    data_registry: &'a DataModuleRegistry,
    component_registry: &'a ComponentRegistry,
    script_runner: &'a dyn ScriptRunner,
    archetype_resolver: ArchetypeResolver,
    chain: Vec<ChainNode>,
    components: Vec<Component>,
}

impl<'a> Builder<'a> {
    /// Build an unconfigured orchestrator. Call [`Builder::load_config`] before anything else.
    #[must_use]
    pub fn new(
        data_registry: &'a DataModuleRegistry,
        component_registry: &'a ComponentRegistry,
        archetype_resolver: ArchetypeResolver,
        script_runner: &'a dyn ScriptRunner,
    ) -> Self {
        Self {
            data_registry,
            component_registry,
            script_runner,
            archetype_resolver,
            chain: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Parse `rig_file`, resolve its archetype chain (depth-first, ancestor order), and store it
    /// (§4.4 `loadConfig`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file is missing, unparsable, or an archetype it
    /// names cannot be located.
    pub fn load_config(&mut self, rig_file: &Path) -> Result<()> {
        self.chain = self.archetype_resolver.resolve_chain(rig_file)?;
        self.components.clear();
        Ok(())
    }

    fn root(&self) -> Result<&ChainNode> {
        self.chain
            .first()
            .ok_or_else(|| Error::configuration("builder has no rig loaded; call load_config first"))
    }

    /// Typed lookup into the nearest-defined value of an unrecognized rig-file key, searching the
    /// archetype chain nearest-first (§4.4 `getRigData`).
    #[must_use]
    pub fn get_rig_data(&self, key: &str) -> Option<serde_json::Value> {
        self.chain.iter().find_map(|node| node.data.extra.get(key).cloned())
    }

    /// [`Builder::get_rig_data`] with a fallback when the key is absent anywhere in the chain.
    #[must_use]
    pub fn get_rig_data_or(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        self.get_rig_data(key).unwrap_or(default)
    }

    /// The currently loaded components, in file order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    fn resolve_file_stack(&self, field: impl Fn(&RigFileData) -> &StringOrList) -> Vec<PathBuf> {
        // Lowest-priority first, highest-priority (the current rig itself) last: the chain is
        // nearest-first (depth 0 = current rig), so the file stack is its reverse (§4.2 "fileStack
        // — ordered list of paths; lowest-priority first... the 'bottom' of the stack is the last
        // element").
        self.chain
            .iter()
            .rev()
            .flat_map(|node| RigFileData::resolve_list(field(&node.data), &node.env_dir))
            .collect()
    }

    // ---- pipeline stages -------------------------------------------------

    /// `preScript` (§4.4 pipeline, §3.6, §11.2): fatal on first failure.
    ///
    /// # Errors
    ///
    /// Returns the first script failure encountered.
    pub fn pre_script(&self, host: &dyn SceneHost) -> Result<()> {
        self.run_scripts(host, ScriptKind::Pre)
    }

    /// `postScript`.
    ///
    /// # Errors
    ///
    /// Returns the first script failure encountered.
    pub fn post_script(&self, host: &dyn SceneHost) -> Result<()> {
        self.run_scripts(host, ScriptKind::Post)
    }

    /// `pubScript`.
    ///
    /// # Errors
    ///
    /// Returns the first script failure encountered.
    pub fn pub_script(&self, host: &dyn SceneHost) -> Result<()> {
        self.run_scripts(host, ScriptKind::Pub)
    }

    fn run_scripts(&self, _host: &dyn SceneHost, kind: ScriptKind) -> Result<()> {
        for script in ScriptCollector::collect(&self.chain, kind) {
            self.script_runner.run(&script)?;
        }
        Ok(())
    }

    /// `importModel` (§4.4 pipeline). Fatal: the model is foundational to every later stage.
    ///
    /// # Errors
    ///
    /// Returns the host's import error.
    pub fn import_model(&self, host: &dyn SceneHost) -> Result<()> {
        for file in self.resolve_file_stack(|d| &d.model_file) {
            host.import_file(&file)?;
        }
        Ok(())
    }

    fn load_kind(&self, host: &dyn SceneHost, field: impl Fn(&RigFileData) -> &StringOrList, data_type: &str) {
        let files = self.resolve_file_stack(field);
        rig_data::load_layered(&files, data_type, self.data_registry, host);
    }

    /// Layered load of `skeletonPos` (§4.4 `loadJoints`). Per-file failures are logged and
    /// skipped (§4.4 "Failure policy").
    pub fn load_joints(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.skeleton_pos, "JointData");
    }

    /// Layered load of `guides` (§4.4 `loadGuideData`).
    pub fn load_guide_data(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.guides, "GuideData");
    }

    /// Layered load of `controlShapes` (§4.4 `loadControlShapes`).
    pub fn load_control_shapes(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.control_shapes, "ControlShapeData");
    }

    /// Layered load of `psd` (§4.4 `loadPoseReaders`).
    pub fn load_pose_readers(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.psd, "PoseReaderData");
    }

    /// Layered load of `skinWeights` (§4.4 `loadSkinWeights`).
    pub fn load_skin_weights(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.skin_weights, "SkinWeightsData");
    }

    /// Layered load of `deformLayers` (§4.4 `loadDeformLayers`).
    pub fn load_deform_layers(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.deform_layers, "DeformLayerData");
    }

    /// Layered load of `deformers` (§4.4 `loadDeformers`).
    pub fn load_deformers(&self, host: &dyn SceneHost) {
        self.load_kind(host, |d| &d.deformers, "DeformerData");
    }

    /// `loadDeformData`: skin weights, then deform layers, then deformers, then shapes, in that
    /// order (§4.4 pipeline).
    pub fn load_deform_data(&self, host: &dyn SceneHost) {
        self.load_skin_weights(host);
        self.load_deform_layers(host);
        self.load_deformers(host);
        self.load_kind(host, |d| &d.shapes, "ShapesData");
    }

    /// Instantiate components from the `components` data file(s), in file order (§4.4
    /// `load_components`, §5).
    ///
    /// # Errors
    ///
    /// Returns an error if a file is malformed or names an unregistered component type.
    pub fn load_components(&mut self) -> Result<()> {
        let files = self.resolve_file_stack(|d| &d.components);
        let mut components = Vec::new();
        for file in &files {
            if !file.exists() {
                continue;
            }
            components.extend(component_file::load_components(file, self.component_registry)?);
        }
        self.components = components;
        Ok(())
    }

    /// Re-apply metaNode values onto already-instantiated components (§4.4 pipeline). A no-op in
    /// this rewrite: [`Builder::load_components`] already seeds each component's parameter store
    /// from the components file, and there is no separate persisted metaNode file for it to
    /// diverge from; kept as an explicit stage for parity with the original pipeline's ordering.
    pub fn load_component_settings(&self) {}

    fn walk_components(
        components: &mut [Component],
        f: &mut dyn FnMut(&mut Component) -> Result<()>,
    ) -> Result<()> {
        for component in components {
            f(component)?;
            Self::walk_components(component.sub_components_mut(), f)?;
        }
        Ok(())
    }

    /// Drive every component (and their declared sub-components, depth-first, §9) through
    /// INITIALIZE.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::ComponentInit`]/[`Error::ComponentPhase`] encountered.
    pub fn initialize(&mut self, host: &dyn SceneHost) -> Result<()> {
        Self::walk_components(&mut self.components, &mut |c| c.initialize(host))
    }

    /// Drive every component through GUIDE.
    ///
    /// # Errors
    ///
    /// Returns the first phase error encountered.
    pub fn guide(&mut self, host: &dyn SceneHost) -> Result<()> {
        Self::walk_components(&mut self.components, &mut |c| c.guide(host))
    }

    /// Drive every component through BUILD.
    ///
    /// # Errors
    ///
    /// Returns the first phase error encountered.
    pub fn build(&mut self, host: &dyn SceneHost) -> Result<()> {
        Self::walk_components(&mut self.components, &mut |c| c.build(host))
    }

    fn collect_handles(components: &[Component], out: &mut BTreeMap<String, Handle>) {
        for component in components {
            if let Some(container) = component.container() {
                out.insert(component.name().to_string(), container.clone());
            }
            Self::collect_handles(component.sub_components(), out);
        }
    }

    fn connect_walk(
        components: &mut [Component],
        host: &dyn SceneHost,
        handles: &BTreeMap<String, Handle>,
    ) -> Result<()> {
        for component in components {
            let parent_handle = component.rig_parent().and_then(|name| handles.get(name));
            if component.rig_parent().is_some() && parent_handle.is_none() {
                tracing::warn!(
                    component = component.name(),
                    rig_parent = component.rig_parent().unwrap_or_default(),
                    "rig parent did not resolve; leaving component free-floating"
                );
            }
            component.connect(host, parent_handle)?;
            Self::connect_walk(component.sub_components_mut(), host, handles)?;
        }
        Ok(())
    }

    /// Drive every component through CONNECT, resolving each `rigParent` against every other
    /// component's container (§4.3 "rigParent semantics").
    ///
    /// # Errors
    ///
    /// Returns the first phase error encountered. An unresolved `rigParent` is a warning, not an
    /// error (§4.4 "Failure policy").
    pub fn connect(&mut self, host: &dyn SceneHost) -> Result<()> {
        let mut handles = BTreeMap::new();
        Self::collect_handles(&self.components, &mut handles);
        Self::connect_walk(&mut self.components, host, &handles)
    }

    /// Drive every component through FINALIZE.
    ///
    /// # Errors
    ///
    /// Returns the first phase error encountered.
    pub fn finalize(&mut self, host: &dyn SceneHost) -> Result<()> {
        Self::walk_components(&mut self.components, &mut |c| c.finalize(host))
    }

    /// Drive every component through OPTIMIZE.
    ///
    /// # Errors
    ///
    /// Returns the first phase error encountered.
    pub fn optimize(&mut self, host: &dyn SceneHost) -> Result<()> {
        Self::walk_components(&mut self.components, &mut |c| c.optimize(host))
    }

    fn run_pipeline(&mut self, host: &dyn SceneHost) -> Result<()> {
        self.pre_script(host)?;
        self.import_model(host)?;
        self.load_joints(host);
        self.load_components()?;
        self.initialize(host)?;
        self.load_component_settings();
        self.guide(host)?;
        self.load_guide_data(host);
        self.build(host)?;
        self.connect(host)?;
        self.finalize(host)?;
        self.load_pose_readers(host);
        self.post_script(host)?;
        self.load_control_shapes(host);
        self.load_deform_data(host);
        Ok(())
    }

    /// The full pipeline (§4.4 `run`): pre-scripts through deform data load, optionally followed
    /// by `pubScript` and a default-settings publish.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage error encountered; loading stages never fail the run (§4.4
    /// "Failure policy").
    pub fn run(&mut self, host: &dyn SceneHost, publish_after: bool) -> Result<()> {
        self.run_pipeline(host)?;
        if publish_after {
            self.pub_script(host)?;
            self.save(host, None, None, None, true)?;
        }
        Ok(())
    }

    /// Run the full pipeline then save (§4.4 `publish`).
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage error, or [`Error::Publish`] if the output path is
    /// unwritable or the scene save fails.
    pub fn publish(
        &mut self,
        host: &dyn SceneHost,
        output_path: Option<&Path>,
        asset_name: Option<&str>,
        file_type: Option<&str>,
        versioning: bool,
    ) -> Result<PathBuf> {
        self.run_pipeline(host)?;
        self.pub_script(host)?;
        self.save(host, output_path, asset_name, file_type, versioning)
    }

    /// Save the currently-built scene without running the pipeline (§4.4 `publish`'s save step).
    /// Exposed separately for callers that have already driven the pipeline stage-by-stage (e.g.
    /// a CLI reporting per-stage exit codes) and need the final save without re-running it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publish`] if the output path is unwritable or the scene save fails.
    pub fn save(
        &self,
        host: &dyn SceneHost,
        output_path: Option<&Path>,
        asset_name: Option<&str>,
        file_type: Option<&str>,
        versioning: bool,
    ) -> Result<PathBuf> {
        let root = self.root()?;
        let rig_name = root.data.rig_name.clone().unwrap_or_else(|| "rig".to_string());
        let output_type = file_type
            .map(str::to_string)
            .or_else(|| root.data.output_file_type.clone())
            .unwrap_or_else(|| "ma".to_string());
        let output_dir = output_path.map(Path::to_path_buf).unwrap_or_else(|| {
            root.data
                .output_file
                .as_ref()
                .map(|f| resolve_path(&root.env_dir, f))
                .unwrap_or_else(|| root.env_dir.clone())
        });
        publish::publish(host, &rig_name, &output_dir, asset_name, &output_type, versioning)
    }

    fn find_component_mut<'c>(
        components: &'c mut [Component],
        name: &str,
        component_type: &str,
    ) -> Option<&'c mut Component> {
        for component in components {
            if component.name() == name && component.component_type() == component_type {
                return Some(component);
            }
            if let Some(found) =
                Self::find_component_mut(component.sub_components_mut(), name, component_type)
            {
                return Some(found);
            }
        }
        None
    }

    /// Run phases INITIALIZE through FINALIZE on one already-loaded component, skipping OPTIMIZE
    /// (§4.4 `buildSingleComponent`). Intended for interactive iteration; cross-component links
    /// made here may later dangle if a sibling component is rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no loaded component matches `(name, component_type)`,
    /// or the first phase error encountered.
    pub fn build_single_component(
        &mut self,
        name: &str,
        component_type: &str,
        host: &dyn SceneHost,
    ) -> Result<()> {
        let mut handles = BTreeMap::new();
        Self::collect_handles(&self.components, &mut handles);

        let component = Self::find_component_mut(&mut self.components, name, component_type)
            .ok_or_else(|| {
                Error::configuration(format!("component '{name}' of type '{component_type}' not found"))
            })?;
        component.initialize(host)?;
        component.guide(host)?;
        component.build(host)?;
        let parent_handle = component.rig_parent().and_then(|n| handles.get(n)).cloned();
        component.connect(host, parent_handle.as_ref())?;
        component.finalize(host)?;
        Ok(())
    }

    /// Delete the named component's scene footprint and rebuild it (§4.4 `editSingleComponent`):
    /// a thin convenience over `teardown` then [`Builder::build_single_component`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no loaded component matches, or the first phase/
    /// teardown error encountered.
    pub fn edit_single_component(
        &mut self,
        name: &str,
        component_type: &str,
        host: &dyn SceneHost,
    ) -> Result<()> {
        if let Some(component) = Self::find_component_mut(&mut self.components, name, component_type) {
            component.teardown(host)?;
        }
        self.build_single_component(name, component_type, host)
    }

    /// Save currently-selected entity keys for `skeletonPos` (§4.4 `saveJoints`).
    ///
    /// # Errors
    ///
    /// Returns the merge engine's plan-construction or execution error.
    pub fn save_joints(
        &self,
        host: &dyn SceneHost,
        data_to_save: &BTreeSet<String>,
        method: &str,
        file_name: Option<&Path>,
    ) -> Result<()> {
        self.save_kind(host, |d| &d.skeleton_pos, "JointData", data_to_save, method, file_name)
    }

    /// Save currently-selected entity keys for `guides` (§4.4 `saveGuides`).
    ///
    /// # Errors
    ///
    /// Returns the merge engine's plan-construction or execution error.
    pub fn save_guides(
        &self,
        host: &dyn SceneHost,
        data_to_save: &BTreeSet<String>,
        method: &str,
        file_name: Option<&Path>,
    ) -> Result<()> {
        self.save_kind(host, |d| &d.guides, "GuideData", data_to_save, method, file_name)
    }

    /// Save currently-selected entity keys for `controlShapes` (§4.4 `saveControlShapes`).
    ///
    /// # Errors
    ///
    /// Returns the merge engine's plan-construction or execution error.
    pub fn save_control_shapes(
        &self,
        host: &dyn SceneHost,
        data_to_save: &BTreeSet<String>,
        method: &str,
        file_name: Option<&Path>,
    ) -> Result<()> {
        self.save_kind(
            host,
            |d| &d.control_shapes,
            "ControlShapeData",
            data_to_save,
            method,
            file_name,
        )
    }

    /// Save currently-selected entity keys for `psd` (§4.4 `savePoseReaders`).
    ///
    /// # Errors
    ///
    /// Returns the merge engine's plan-construction or execution error.
    pub fn save_pose_readers(
        &self,
        host: &dyn SceneHost,
        data_to_save: &BTreeSet<String>,
        method: &str,
        file_name: Option<&Path>,
    ) -> Result<()> {
        self.save_kind(host, |d| &d.psd, "PoseReaderData", data_to_save, method, file_name)
    }

    /// Save currently-selected entity keys for `deformLayers` (§4.4 `saveDeformLayers`).
    ///
    /// # Errors
    ///
    /// Returns the merge engine's plan-construction or execution error.
    pub fn save_deform_layers(
        &self,
        host: &dyn SceneHost,
        data_to_save: &BTreeSet<String>,
        method: &str,
        file_name: Option<&Path>,
    ) -> Result<()> {
        self.save_kind(
            host,
            |d| &d.deform_layers,
            "DeformLayerData",
            data_to_save,
            method,
            file_name,
        )
    }

    /// Write the current component list back to its source file (§4.4 `saveComponents`).
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    pub fn save_components(&self, path: &Path) -> Result<()> {
        component_file::save_components(&self.components, path)
    }

    fn save_kind(
        &self,
        host: &dyn SceneHost,
        field: impl Fn(&RigFileData) -> &StringOrList,
        data_type: &str,
        data_to_save: &BTreeSet<String>,
        method: &str,
        file_name: Option<&Path>,
    ) -> Result<()> {
        let files = self.resolve_file_stack(field);
        let plan = rig_data::gather_layered_save_data(
            data_to_save,
            &files,
            data_type,
            method,
            file_name,
            self.data_registry,
        )?;
        rig_data::perform_layered_save(&plan, data_type, self.data_registry, host)
    }
}

//! # rig-data
//!
//! The DataModule Registry and the Layered Data Merge Engine (§3–4 of the system this crate
//! implements).

pub mod entity;
pub mod layered;
pub mod registry;

pub use entity::{sniff, DataEntity, DataFileDocument, GenericDataEntity, StorageLayout};
pub use layered::{
    gather_layered_save_data, load_layered, perform_layered_save, validate_plan_json, LayeredPlan,
    MergeMethod, PlanEntry,
};
pub use registry::{DataEntityFactory, DataModuleRegistry};

//! # rig-component
//!
//! The Component lifecycle state machine: phase progression, the reversible parameter channel,
//! component discovery, and an in-memory reference scene host for tests (§3.2–3.3, §4.3, §9).

pub mod component;
pub mod parameter;
pub mod phase;
pub mod registry;
pub mod scene;

pub use component::{Component, ComponentBehavior, ComponentContext, NoopBehavior};
pub use parameter::{InMemoryParameterStore, ParameterStore, ParameterValue};
pub use phase::Phase;
pub use registry::{ComponentFactory, ComponentRegistry};
pub use scene::InMemorySceneHost;

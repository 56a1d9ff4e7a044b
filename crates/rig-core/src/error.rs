//! Error types for the rig-assembly core.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error taxonomy shared by every subsystem of the core.
#[derive(Debug, Error)]
pub enum Error {
    /// Rig file missing, unparsable, or missing a required key.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A merge or load requested a data kind the registry has no handler for.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// `method` was not one of `merge`, `new`, `overwrite`.
    #[error("invalid merge method: {0}")]
    InvalidMergeMethod(String),

    /// `new` or `overwrite` was requested without a target file name.
    #[error("missing target file for method {0}")]
    MissingTargetFile(String),

    /// A layered plan is missing `changed`, `added`, or `removed` for some file, or is empty.
    #[error("invalid layered plan: {0}")]
    InvalidLayeredPlan(String),

    /// Parameter binding or metaNode creation failed during component INITIALIZE.
    #[error("component '{0}' failed to initialize: {1}")]
    ComponentInit(String, String),

    /// A component phase raised; carries the component name, the phase it failed in, and the
    /// wrapped cause.
    #[error("component '{component}' failed during {phase}: {source}")]
    ComponentPhase {
        /// Name of the failing component.
        component: String,
        /// Phase the component was executing.
        phase: String,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// CONNECT could not resolve the named `rigParent` handle. Non-fatal; logged as a warning by
    /// callers and never constructed as a propagating error path in the happy path, but kept in
    /// the taxonomy for callers that want to surface it explicitly.
    #[error("unresolved rig parent '{0}' for component '{1}'")]
    UnresolvedRigParent(String, String),

    /// A file's declared `dataType` is neither the requested kind nor `"AbstractData"`.
    #[error("data file '{path}' declares type '{declared}', expected '{expected}'")]
    DataFileTypeMismatch {
        /// Path of the offending file.
        path: String,
        /// The `dataType` actually found in the file.
        declared: String,
        /// The `dataType` that was requested.
        expected: String,
    },

    /// Output path unwritable or scene save failed during publish.
    #[error("publish failed: {0}")]
    Publish(String),

    /// I/O failure reading or writing a file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build a [`Error::Configuration`].
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build an [`Error::UnknownDataType`].
    #[must_use]
    pub fn unknown_data_type(tag: impl Into<String>) -> Self {
        Self::UnknownDataType(tag.into())
    }

    /// Build an [`Error::InvalidMergeMethod`].
    #[must_use]
    pub fn invalid_merge_method(method: impl Into<String>) -> Self {
        Self::InvalidMergeMethod(method.into())
    }

    /// Build a [`Error::MissingTargetFile`].
    #[must_use]
    pub fn missing_target_file(method: impl Into<String>) -> Self {
        Self::MissingTargetFile(method.into())
    }

    /// Build an [`Error::InvalidLayeredPlan`].
    #[must_use]
    pub fn invalid_layered_plan(msg: impl Into<String>) -> Self {
        Self::InvalidLayeredPlan(msg.into())
    }

    /// Build a [`Error::ComponentInit`].
    #[must_use]
    pub fn component_init(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ComponentInit(name.into(), msg.into())
    }

    /// Build a [`Error::ComponentPhase`], wrapping the cause.
    #[must_use]
    pub fn component_phase(
        component: impl Into<String>,
        phase: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::ComponentPhase {
            component: component.into(),
            phase: phase.into(),
            source: Box::new(source),
        }
    }

    /// Build an [`Error::UnresolvedRigParent`].
    #[must_use]
    pub fn unresolved_rig_parent(parent: impl Into<String>, component: impl Into<String>) -> Self {
        Self::UnresolvedRigParent(parent.into(), component.into())
    }

    /// Build a [`Error::DataFileTypeMismatch`].
    #[must_use]
    pub fn data_file_type_mismatch(
        path: impl Into<String>,
        declared: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::DataFileTypeMismatch {
            path: path.into(),
            declared: declared.into(),
            expected: expected.into(),
        }
    }

    /// Build a [`Error::Publish`].
    #[must_use]
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Build a [`Error::Serialization`].
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

//! Opaque identifiers into the host scene graph.

use std::fmt;

/// An opaque reference to a node in the host DCC scene graph.
///
/// The core never interprets a `Handle`'s contents; it is produced and consumed entirely by the
/// [`SceneHost`](crate) the Builder is configured with. Cloning is cheap (it is just a string) and
/// handles are safely compared and hashed for use as map keys (e.g. the claimed-key sets in the
/// layered merge engine).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Handle(pub String);

impl Handle {
    /// Wrap a string as a handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Handle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Handle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

//! Typed references to the objects grants and tokens attach to.
//!
//! Access grants and download tokens never reference a bare id string; they
//! carry an [`ObjectRef`] pairing the id with its [`ObjectType`] so that a
//! grant on a root sample can never be confused with a grant on a derived
//! sample that happens to share an id prefix.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of object an access grant or download token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// A root sample registered directly by a tenant.
    Sample,
    /// A sample derived from a root sample or another derived sample.
    DerivedSample,
}

impl ObjectType {
    /// Returns the canonical string form used in storage and audit details.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::DerivedSample => "derived_sample",
        }
    }

    /// Parses the canonical string form produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sample" => Some(Self::Sample),
            "derived_sample" => Some(Self::DerivedSample),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed reference to a sample or derived sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectRef {
    /// Kind of the referenced object.
    pub object_type: ObjectType,
    /// Identifier of the referenced object.
    pub object_id: String,
}

impl ObjectRef {
    /// Builds a reference to a root sample.
    #[must_use]
    pub fn sample(id: impl Into<String>) -> Self {
        Self {
            object_type: ObjectType::Sample,
            object_id: id.into(),
        }
    }

    /// Builds a reference to a derived sample.
    #[must_use]
    pub fn derived(id: impl Into<String>) -> Self {
        Self {
            object_type: ObjectType::DerivedSample,
            object_id: id.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

//! Persisted sample and derived-sample records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by samples and derived samples.
///
/// The only transition is `Active -> Deleted` and it is terminal. Deleted
/// rows are tombstones: they stay in storage so lineage history remains
/// reconstructable, and they are never re-parented or revived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// The record is live and participates in lineage queries.
    Active,
    /// The record is soft-deleted and excluded from traversal and counts.
    Deleted,
}

impl LifecycleState {
    /// Returns the canonical string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Parses the canonical string form produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the actor invoking a lineage operation.
///
/// Cascade deletion is restricted to administrators; everything else is
/// available to ordinary members of the owning tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Tenant administrator.
    Admin,
    /// Ordinary tenant member.
    Member,
}

impl ActorRole {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Parses the canonical string form produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An original, non-derived unit of material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleRecord {
    /// Tenant-unique identifier.
    pub sample_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Lifecycle status.
    pub status: LifecycleState,
    /// Creation time, Unix seconds.
    pub created_at: u64,
    /// Soft-delete time, Unix seconds. Set exactly once.
    pub deleted_at: Option<u64>,
}

impl SampleRecord {
    /// Creates a new active sample record.
    #[must_use]
    pub fn new(sample_id: impl Into<String>, tenant_id: impl Into<String>, created_at: u64) -> Self {
        Self {
            sample_id: sample_id.into(),
            tenant_id: tenant_id.into(),
            status: LifecycleState::Active,
            created_at,
            deleted_at: None,
        }
    }

    /// Whether the record is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LifecycleState::Active
    }
}

/// A node produced by transforming a sample or another derived sample.
///
/// `root_sample_id`, `parent_id`, and `depth` are write-once at creation.
/// Every node in a lineage chain shares the chain's `root_sample_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedSampleRecord {
    /// Tenant-unique identifier.
    pub derived_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// The ultimate original sample at the base of this chain.
    pub root_sample_id: String,
    /// Immediate predecessor. `None` means derived directly from the root
    /// sample.
    pub parent_id: Option<String>,
    /// Generational distance from the root: `0` for a first derivation,
    /// bounded by the configured maximum.
    pub depth: u8,
    /// Lifecycle status.
    pub status: LifecycleState,
    /// Creation time, Unix seconds.
    pub created_at: u64,
    /// Soft-delete time, Unix seconds. Set exactly once.
    pub deleted_at: Option<u64>,
}

impl DerivedSampleRecord {
    /// Whether the record is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LifecycleState::Active
    }
}

/// Result of a deletion pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionCheck {
    /// True when the target has no active dependents and an ordinary
    /// delete would succeed.
    pub can_delete: bool,
    /// Number of active derived samples that reference the target as their
    /// chain root or immediate parent.
    pub dependent_count: u64,
}

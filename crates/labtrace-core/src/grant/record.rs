//! Persisted access-grant records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::ObjectRef;

/// Role conveyed by an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantRole {
    /// Read-only access.
    Viewer,
    /// Read access plus analysis workflows.
    Analyst,
    /// Full control over the shared object.
    Admin,
}

impl GrantRole {
    /// Returns the canonical string form used in storage and audit details.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Analyst => "analyst",
            Self::Admin => "admin",
        }
    }

    /// Parses the canonical string form produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "viewer" => Some(Self::Viewer),
            "analyst" => Some(Self::Analyst),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for GrantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability record permitting one organization to access another
/// tenant's object under a role.
///
/// Conceptually immutable after creation: the only mutation is revocation,
/// which stamps `revoked_at`, `revocation_reason`, and `revoked_by` exactly
/// once. A grant is never un-revoked and never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessGrantRecord {
    /// Engine-minted identifier (UUID v4).
    pub grant_id: String,
    /// The shared object.
    pub object: ObjectRef,
    /// Tenant that owns the object and minted the grant.
    pub owner_tenant_id: String,
    /// Organization the grant was issued to.
    pub granted_to_org_id: String,
    /// Role conveyed to the grantee.
    pub granted_role: GrantRole,
    /// Whether the grantee may re-share the object.
    pub can_reshare: bool,
    /// Creation time, Unix seconds.
    pub created_at: u64,
    /// Expiry time, Unix seconds. `None` means the grant never expires.
    pub expires_at: Option<u64>,
    /// Revocation time. Set exactly once.
    pub revoked_at: Option<u64>,
    /// Reason supplied by the revoking party.
    pub revocation_reason: Option<String>,
    /// Organization that performed the revocation.
    pub revoked_by: Option<String>,
}

impl AccessGrantRecord {
    /// Whether the grant has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

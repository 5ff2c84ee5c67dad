//! Persisted download-token records.

use serde::{Deserialize, Serialize};

use crate::object::ObjectRef;

/// A bearer credential for one access event, persisted digest-only.
///
/// The raw secret is handed to the caller exactly once at issuance and is
/// never stored; only its SHA-256 digest is. `grant_id` is a weak
/// back-reference: revoking the grant revokes dependent tokens, but a
/// token never keeps a grant alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadTokenRecord {
    /// Engine-minted identifier (UUID v4).
    pub token_id: String,
    /// SHA-256 digest of the raw secret.
    pub digest: [u8; 32],
    /// Object the token grants one access event to.
    pub object: ObjectRef,
    /// Tenant that owns the object; validation is scoped to it.
    pub tenant_id: String,
    /// User the token was issued to.
    pub issued_to_user_id: String,
    /// Grant this token was issued under, when any.
    pub grant_id: Option<String>,
    /// Issuance time, Unix seconds.
    pub issued_at: u64,
    /// Expiry time, Unix seconds. Always set; tokens are never unbounded.
    pub expires_at: u64,
    /// Whether the token is consumed by its first use.
    pub one_time_use: bool,
    /// First-use time for one-time tokens. Set exactly once.
    pub used_at: Option<u64>,
    /// Revocation time, cascaded from grant revocation. Set exactly once.
    pub revoked_at: Option<u64>,
}

impl DownloadTokenRecord {
    /// Whether the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Whether a one-time token has already been consumed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.one_time_use && self.used_at.is_some()
    }
}

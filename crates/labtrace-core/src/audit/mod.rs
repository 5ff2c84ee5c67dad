//! Append-only, hash-chained audit entries.
//!
//! Every mutating operation in the engine records an [`AuditEntryRecord`].
//! Entries are BLAKE3-chained: each entry's hash covers the previous
//! entry's hash plus the entry's own canonical content, so any edit,
//! removal, or reordering of history breaks the chain and is detectable
//! with [`verify_chain`].
//!
//! # Call paths
//!
//! There are two distinct write paths, never one ambiguous function:
//!
//! - [`record_best_effort`] — routine actions. An append failure is logged
//!   and swallowed; the caller's operation still commits.
//! - [`record_within`] — the revocation path. An append failure propagates
//!   and aborts the caller's transaction, so a revocation without its audit
//!   entry can never be observed.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::object::ObjectRef;
use crate::store::{StoreError, StoreTx};

/// Size of a chain hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Type alias for a 32-byte chain hash.
pub type AuditHash = [u8; HASH_SIZE];

/// The zero hash used as the previous hash for the first audit entry.
pub const GENESIS_PREV_HASH: AuditHash = [0u8; HASH_SIZE];

/// Action recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A root sample was registered.
    RegisterSample,
    /// A derived sample passed validation and was created.
    CreateDerived,
    /// A sample or derived sample was individually soft-deleted.
    DeleteSample,
    /// A root and all its descendants were soft-deleted together.
    CascadeDelete,
    /// A download token was issued.
    IssueToken,
    /// A one-time download token was consumed.
    MarkUsed,
    /// An access grant was created.
    GrantAccess,
    /// An access grant and its dependent tokens were revoked.
    RevokeAccess,
}

impl AuditAction {
    /// Returns the canonical string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RegisterSample => "register_sample",
            Self::CreateDerived => "create_derived",
            Self::DeleteSample => "delete_sample",
            Self::CascadeDelete => "cascade_delete",
            Self::IssueToken => "issue_token",
            Self::MarkUsed => "mark_used",
            Self::GrantAccess => "grant_access",
            Self::RevokeAccess => "revoke_access",
        }
    }

    /// Parses the canonical string form produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "register_sample" => Some(Self::RegisterSample),
            "create_derived" => Some(Self::CreateDerived),
            "delete_sample" => Some(Self::DeleteSample),
            "cascade_delete" => Some(Self::CascadeDelete),
            "issue_token" => Some(Self::IssueToken),
            "mark_used" => Some(Self::MarkUsed),
            "grant_access" => Some(Self::GrantAccess),
            "revoke_access" => Some(Self::RevokeAccess),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request context captured alongside an audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Client address as reported by the request layer.
    pub ip: Option<String>,
    /// Client user agent as reported by the request layer.
    pub user_agent: Option<String>,
}

/// Content of an audit entry before it is hashed and sequenced.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Object the action was performed on.
    pub object: ObjectRef,
    /// The action performed.
    pub action: AuditAction,
    /// User or organization that performed it.
    pub actor_id: String,
    /// Tenant the action was scoped to.
    pub tenant_id: String,
    /// Free-form structured detail.
    pub detail: serde_json::Value,
    /// Request context.
    pub request_meta: RequestMeta,
}

impl NewAuditEntry {
    /// Creates an entry with empty request metadata.
    #[must_use]
    pub fn new(
        object: ObjectRef,
        action: AuditAction,
        actor_id: impl Into<String>,
        tenant_id: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            object,
            action,
            actor_id: actor_id.into(),
            tenant_id: tenant_id.into(),
            detail,
            request_meta: RequestMeta::default(),
        }
    }

    /// Attaches request metadata (builder pattern).
    #[must_use]
    pub fn with_request_meta(mut self, request_meta: RequestMeta) -> Self {
        self.request_meta = request_meta;
        self
    }
}

/// A fully hashed audit entry awaiting its store-assigned sequence id.
#[derive(Debug, Clone)]
pub struct PendingAuditEntry {
    /// Object the action was performed on.
    pub object: ObjectRef,
    /// The action performed.
    pub action: AuditAction,
    /// User or organization that performed it.
    pub actor_id: String,
    /// Tenant the action was scoped to.
    pub tenant_id: String,
    /// Free-form structured detail.
    pub detail: serde_json::Value,
    /// Wall-clock time of the action, Unix seconds.
    pub recorded_at: u64,
    /// Request context.
    pub request_meta: RequestMeta,
    /// Hash of the previous entry.
    pub prev_hash: AuditHash,
    /// Hash of this entry's content, chained to `prev_hash`.
    pub entry_hash: AuditHash,
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditEntryRecord {
    /// Sequence id assigned by the store on append.
    pub seq_id: u64,
    /// Object the action was performed on.
    pub object: ObjectRef,
    /// The action performed.
    pub action: AuditAction,
    /// User or organization that performed it.
    pub actor_id: String,
    /// Tenant the action was scoped to.
    pub tenant_id: String,
    /// Free-form structured detail.
    pub detail: serde_json::Value,
    /// Wall-clock time of the action, Unix seconds.
    pub recorded_at: u64,
    /// Request context.
    pub request_meta: RequestMeta,
    /// Hash of the previous entry.
    pub prev_hash: AuditHash,
    /// Hash of this entry's content, chained to `prev_hash`.
    pub entry_hash: AuditHash,
}

/// Canonical serialization target for chain hashing.
///
/// Field order is the hash contract; reordering fields here breaks every
/// previously recorded chain.
#[derive(Serialize)]
struct ChainContent<'a> {
    object: &'a ObjectRef,
    action: AuditAction,
    actor_id: &'a str,
    tenant_id: &'a str,
    detail: &'a serde_json::Value,
    recorded_at: u64,
    request_meta: &'a RequestMeta,
}

/// Hashes entry content chained to the previous entry's hash.
///
/// Computed over `prev_hash || canonical content` with BLAKE3.
fn chain_hash(
    prev_hash: &AuditHash,
    object: &ObjectRef,
    action: AuditAction,
    actor_id: &str,
    tenant_id: &str,
    detail: &serde_json::Value,
    recorded_at: u64,
    request_meta: &RequestMeta,
) -> Result<AuditHash, StoreError> {
    let content = serde_json::to_vec(&ChainContent {
        object,
        action,
        actor_id,
        tenant_id,
        detail,
        recorded_at,
        request_meta,
    })
    .map_err(|e| StoreError::Serialization {
        detail: e.to_string(),
    })?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(prev_hash);
    hasher.update(&content);
    Ok(*hasher.finalize().as_bytes())
}

/// Appends an audit entry inside the caller's open transaction.
///
/// Used exclusively by the revocation path: the append participates in the
/// transaction, so its failure aborts the caller's whole operation.
///
/// Returns the store-assigned sequence id.
///
/// # Errors
///
/// Returns an error if the chain head cannot be read, the entry cannot be
/// serialized, or the append fails.
pub fn record_within(
    tx: &mut dyn StoreTx,
    entry: NewAuditEntry,
    recorded_at: u64,
) -> Result<u64, StoreError> {
    let prev_hash = tx.audit_head_hash()?;
    let entry_hash = chain_hash(
        &prev_hash,
        &entry.object,
        entry.action,
        &entry.actor_id,
        &entry.tenant_id,
        &entry.detail,
        recorded_at,
        &entry.request_meta,
    )?;

    tx.append_audit(&PendingAuditEntry {
        object: entry.object,
        action: entry.action,
        actor_id: entry.actor_id,
        tenant_id: entry.tenant_id,
        detail: entry.detail,
        recorded_at,
        request_meta: entry.request_meta,
        prev_hash,
        entry_hash,
    })
}

/// Appends an audit entry without failing the caller.
///
/// An append failure is logged and swallowed. Outside the revocation path
/// audit is best-effort: the primary operation must not be lost because
/// the audit log could not be written.
pub fn record_best_effort(tx: &mut dyn StoreTx, entry: NewAuditEntry, recorded_at: u64) {
    let action = entry.action;
    let object = entry.object.clone();
    if let Err(error) = record_within(tx, entry, recorded_at) {
        warn!(%action, %object, %error, "dropped audit entry");
    }
}

/// Verifies the hash chain over a complete audit log in sequence order.
///
/// Returns false if any entry's content hash does not recompute, if any
/// link does not match its predecessor's hash, or if the first entry is
/// not chained to the genesis hash.
#[must_use]
pub fn verify_chain(entries: &[AuditEntryRecord]) -> bool {
    let mut expected_prev = GENESIS_PREV_HASH;

    for entry in entries {
        if entry.prev_hash != expected_prev {
            return false;
        }
        let Ok(recomputed) = chain_hash(
            &entry.prev_hash,
            &entry.object,
            entry.action,
            &entry.actor_id,
            &entry.tenant_id,
            &entry.detail,
            entry.recorded_at,
            &entry.request_meta,
        ) else {
            return false;
        };
        if recomputed != entry.entry_hash {
            return false;
        }
        expected_prev = entry.entry_hash;
    }

    true
}

//! Grant creation and the atomic revocation path.

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::error::GrantError;
use super::record::{AccessGrantRecord, GrantRole};
use crate::audit::{self, AuditAction, NewAuditEntry, RequestMeta};
use crate::clock::Clock;
use crate::object::ObjectRef;
use crate::store::Store;

/// Parameters for [`RevocationCoordinator::create_grant`].
#[derive(Debug, Clone)]
pub struct CreateGrantRequest {
    /// Object being shared.
    pub object: ObjectRef,
    /// Tenant that owns the object.
    pub owner_tenant_id: String,
    /// Organization receiving access.
    pub granted_to_org_id: String,
    /// Role the grantee acts under.
    pub granted_role: GrantRole,
    /// Whether the grantee may share the object onward.
    pub can_reshare: bool,
    /// Expiry, Unix seconds. `None` never expires.
    pub expires_at: Option<u64>,
    /// Actor recorded in the audit trail.
    pub actor_id: String,
    /// Request context recorded in the audit trail.
    pub request_meta: RequestMeta,
}

impl CreateGrantRequest {
    /// Creates a non-resharable, never-expiring grant request.
    #[must_use]
    pub fn new(
        object: ObjectRef,
        owner_tenant_id: impl Into<String>,
        granted_to_org_id: impl Into<String>,
        granted_role: GrantRole,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            object,
            owner_tenant_id: owner_tenant_id.into(),
            granted_to_org_id: granted_to_org_id.into(),
            granted_role,
            can_reshare: false,
            expires_at: None,
            actor_id: actor_id.into(),
            request_meta: RequestMeta::default(),
        }
    }

    /// Sets an expiry on the grant.
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Allows the grantee to share the object onward.
    #[must_use]
    pub const fn resharable(mut self) -> Self {
        self.can_reshare = true;
        self
    }

    /// Attaches request metadata for the audit trail.
    #[must_use]
    pub fn with_request_meta(mut self, request_meta: RequestMeta) -> Self {
        self.request_meta = request_meta;
        self
    }
}

/// Parameters for [`RevocationCoordinator::revoke_grant`].
#[derive(Debug, Clone)]
pub struct RevokeGrantRequest {
    /// Object the grant covers.
    pub object: ObjectRef,
    /// Organization losing access.
    pub granted_to_org_id: String,
    /// Organization performing the revocation.
    pub revoked_by_org_id: String,
    /// Reason recorded on the grant and in the audit trail.
    pub reason: String,
    /// Request context recorded in the audit trail.
    pub request_meta: RequestMeta,
}

impl RevokeGrantRequest {
    /// Creates a revocation request.
    #[must_use]
    pub fn new(
        object: ObjectRef,
        granted_to_org_id: impl Into<String>,
        revoked_by_org_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            object,
            granted_to_org_id: granted_to_org_id.into(),
            revoked_by_org_id: revoked_by_org_id.into(),
            reason: reason.into(),
            request_meta: RequestMeta::default(),
        }
    }

    /// Attaches request metadata for the audit trail.
    #[must_use]
    pub fn with_request_meta(mut self, request_meta: RequestMeta) -> Self {
        self.request_meta = request_meta;
        self
    }
}

/// Manages cross-organization access grants.
///
/// Revocation is the one path in this crate where the audit write is part
/// of the transaction instead of best-effort: a revocation that cannot be
/// recorded does not happen. Everything inside [`Self::revoke_grant`]
/// commits or rolls back as one unit, so no reader ever observes a
/// revoked grant with live dependent tokens.
#[derive(Debug)]
pub struct RevocationCoordinator<C: Clock> {
    clock: C,
}

impl<C: Clock> RevocationCoordinator<C> {
    /// Creates a coordinator with the given clock.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Creates an access grant for an (object, grantee) pair.
    ///
    /// At most one un-revoked grant may exist per pair. An existing one
    /// must be revoked before a replacement is minted, even if it has
    /// already lapsed.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::AlreadyGranted`] when an un-revoked grant for
    /// the pair exists.
    pub fn create_grant<S: Store>(
        &self,
        store: &mut S,
        request: CreateGrantRequest,
    ) -> Result<AccessGrantRecord, GrantError> {
        let now = self.clock.now_secs();
        let grant_id = Uuid::new_v4().to_string();

        store.with_tx(|tx| {
            if tx
                .find_active_grant(&request.object, &request.granted_to_org_id)?
                .is_some()
            {
                return Err(GrantError::AlreadyGranted {
                    object_id: request.object.object_id.clone(),
                });
            }

            let record = AccessGrantRecord {
                grant_id: grant_id.clone(),
                object: request.object.clone(),
                owner_tenant_id: request.owner_tenant_id.clone(),
                granted_to_org_id: request.granted_to_org_id.clone(),
                granted_role: request.granted_role,
                can_reshare: request.can_reshare,
                created_at: now,
                expires_at: request.expires_at,
                revoked_at: None,
                revocation_reason: None,
                revoked_by: None,
            };
            tx.insert_grant(&record)?;

            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    request.object.clone(),
                    AuditAction::GrantAccess,
                    request.actor_id.clone(),
                    request.owner_tenant_id.clone(),
                    json!({
                        "grant_id": grant_id,
                        "granted_to_org_id": request.granted_to_org_id,
                        "granted_role": request.granted_role,
                        "can_reshare": request.can_reshare,
                        "expires_at": request.expires_at,
                    }),
                )
                .with_request_meta(request.request_meta.clone()),
                now,
            );
            Ok(record)
        })
    }

    /// Lists every grant ever minted for an object, revoked ones
    /// included.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn grants_for_object<S: Store>(
        &self,
        store: &mut S,
        object: &ObjectRef,
    ) -> Result<Vec<AccessGrantRecord>, GrantError> {
        store.with_tx(|tx| Ok(tx.grants_for_object(object)?))
    }

    /// Revokes the active grant for an (object, grantee) pair along with
    /// every dependent un-revoked token, in one transaction.
    ///
    /// The audit entry carrying the grant's prior role, original expiry,
    /// the reason, and the dependent token count is part of that
    /// transaction. Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::GrantNotFound`] when no un-revoked grant
    /// matches, a second revocation included. Any storage failure rolls
    /// the whole revocation back.
    pub fn revoke_grant<S: Store>(
        &self,
        store: &mut S,
        request: RevokeGrantRequest,
    ) -> Result<u64, GrantError> {
        let now = self.clock.now_secs();

        store.with_tx(|tx| {
            let grant = tx
                .find_active_grant(&request.object, &request.granted_to_org_id)?
                .ok_or(GrantError::GrantNotFound)?;

            tx.mark_grant_revoked(
                &grant.grant_id,
                now,
                &request.reason,
                &request.revoked_by_org_id,
            )?;

            let mut revoked_tokens = 0_u64;
            for token in tx.tokens_for_grant(&grant.grant_id)? {
                if token.revoked_at.is_none() {
                    tx.mark_token_revoked(&token.token_id, now)?;
                    revoked_tokens += 1;
                }
            }

            audit::record_within(
                tx,
                NewAuditEntry::new(
                    request.object.clone(),
                    AuditAction::RevokeAccess,
                    request.revoked_by_org_id.clone(),
                    grant.owner_tenant_id.clone(),
                    json!({
                        "grant_id": grant.grant_id,
                        "granted_to_org_id": request.granted_to_org_id,
                        "prior_role": grant.granted_role,
                        "original_expires_at": grant.expires_at,
                        "reason": request.reason,
                        "revoked_token_count": revoked_tokens,
                    }),
                )
                .with_request_meta(request.request_meta.clone()),
                now,
            )?;

            debug!(
                grant_id = %grant.grant_id,
                object = %request.object,
                revoked_tokens,
                "revoked access grant"
            );
            Ok(revoked_tokens)
        })
    }
}

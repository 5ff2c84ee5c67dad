//! Download token issuance.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::digest::{digest_secret, generate_secret};
use super::error::TokenError;
use super::expiry::is_expired_with_buffer;
use super::record::DownloadTokenRecord;
use crate::audit::{self, AuditAction, NewAuditEntry, RequestMeta};
use crate::clock::Clock;
use crate::config::{EngineConfig, MIN_SECRET_LEN};
use crate::object::ObjectRef;
use crate::store::Store;

/// Parameters for [`TokenIssuer::issue`].
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Object the token authorizes a download of.
    pub object: ObjectRef,
    /// Tenant that owns the object.
    pub tenant_id: String,
    /// User the token is issued to.
    pub issued_to_user_id: String,
    /// Cross-organization grant backing the token, when the recipient is
    /// not a member of the owning tenant.
    pub grant_id: Option<String>,
    /// Lifetime override in minutes. The configured default applies when
    /// absent.
    pub ttl_minutes: Option<u64>,
    /// Whether the first successful download consumes the token.
    pub one_time_use: bool,
    /// Request context recorded in the audit trail.
    pub request_meta: RequestMeta,
}

impl IssueRequest {
    /// Creates a request with the configured default lifetime, reusable
    /// semantics, and no backing grant.
    #[must_use]
    pub fn new(
        object: ObjectRef,
        tenant_id: impl Into<String>,
        issued_to_user_id: impl Into<String>,
    ) -> Self {
        Self {
            object,
            tenant_id: tenant_id.into(),
            issued_to_user_id: issued_to_user_id.into(),
            grant_id: None,
            ttl_minutes: None,
            one_time_use: false,
            request_meta: RequestMeta::default(),
        }
    }

    /// Backs the token by an access grant; revoking the grant revokes the
    /// token.
    #[must_use]
    pub fn with_grant(mut self, grant_id: impl Into<String>) -> Self {
        self.grant_id = Some(grant_id.into());
        self
    }

    /// Overrides the token lifetime.
    #[must_use]
    pub const fn with_ttl_minutes(mut self, ttl_minutes: u64) -> Self {
        self.ttl_minutes = Some(ttl_minutes);
        self
    }

    /// Marks the token as consumed by its first download.
    #[must_use]
    pub const fn one_time(mut self) -> Self {
        self.one_time_use = true;
        self
    }

    /// Attaches request metadata for the audit trail.
    #[must_use]
    pub fn with_request_meta(mut self, request_meta: RequestMeta) -> Self {
        self.request_meta = request_meta;
        self
    }
}

/// A freshly issued token.
#[derive(Debug)]
pub struct IssuedToken {
    /// Identifier of the stored token record.
    pub token_id: String,
    /// The raw secret. This is the only copy; storage keeps the digest.
    pub secret: SecretString,
    /// Expiry, Unix seconds.
    pub expires_at: u64,
}

/// Issues download tokens against the configured entropy and lifetime
/// policy.
#[derive(Debug)]
pub struct TokenIssuer<C: Clock> {
    clock: C,
    config: EngineConfig,
}

impl<C: Clock> TokenIssuer<C> {
    /// Creates an issuer with the given clock and configuration.
    #[must_use]
    pub fn new(clock: C, config: EngineConfig) -> Self {
        Self { clock, config }
    }

    /// Issues a token and returns the raw secret exactly once.
    ///
    /// The secret is never persisted or retrievable again; losing the
    /// returned value means issuing a new token. When the request names a
    /// backing grant, the grant must still be live at issue time.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::SecretTooShort`] for an unusable entropy
    /// configuration, [`TokenError::GrantRevoked`] or
    /// [`TokenError::GrantExpired`] when the backing grant is unusable,
    /// and storage failures unchanged.
    pub fn issue<S: Store>(
        &self,
        store: &mut S,
        request: IssueRequest,
    ) -> Result<IssuedToken, TokenError> {
        if self.config.secret_len < MIN_SECRET_LEN {
            return Err(TokenError::SecretTooShort {
                len: self.config.secret_len,
                min: MIN_SECRET_LEN,
            });
        }

        let now = self.clock.now_secs();
        let ttl_minutes = request.ttl_minutes.unwrap_or(self.config.token_ttl_minutes);
        let expires_at = now.saturating_add(ttl_minutes.saturating_mul(60));
        let buffer_secs = self.config.expiry_safety_buffer_secs;

        let secret = generate_secret(self.config.secret_len);
        let digest = digest_secret(secret.expose_secret());
        let token_id = Uuid::new_v4().to_string();

        store.with_tx(|tx| {
            if let Some(grant_id) = request.grant_id.as_deref() {
                let grant = tx.get_grant(grant_id)?.ok_or(TokenError::GrantRevoked)?;
                if grant.is_revoked() {
                    return Err(TokenError::GrantRevoked);
                }
                if is_expired_with_buffer(now, grant.expires_at, buffer_secs) {
                    return Err(TokenError::GrantExpired);
                }
            }

            let record = DownloadTokenRecord {
                token_id: token_id.clone(),
                digest,
                object: request.object.clone(),
                tenant_id: request.tenant_id.clone(),
                issued_to_user_id: request.issued_to_user_id.clone(),
                grant_id: request.grant_id.clone(),
                issued_at: now,
                expires_at,
                one_time_use: request.one_time_use,
                used_at: None,
                revoked_at: None,
            };
            tx.insert_token(&record)?;
            debug!(%token_id, object = %record.object, expires_at, "issued download token");

            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    request.object.clone(),
                    AuditAction::IssueToken,
                    request.issued_to_user_id.clone(),
                    request.tenant_id.clone(),
                    json!({
                        "token_id": token_id,
                        "grant_id": request.grant_id,
                        "one_time_use": request.one_time_use,
                        "expires_at": expires_at,
                    }),
                )
                .with_request_meta(request.request_meta.clone()),
                now,
            );
            Ok(())
        })?;

        Ok(IssuedToken {
            token_id,
            secret,
            expires_at,
        })
    }
}

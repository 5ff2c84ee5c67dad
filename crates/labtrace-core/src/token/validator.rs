//! Token validation and consumption.

use serde_json::json;
use tracing::debug;

use super::digest::digest_secret;
use super::error::TokenError;
use super::expiry::is_expired_with_buffer;
use crate::audit::{self, AuditAction, NewAuditEntry};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::object::ObjectRef;
use crate::store::Store;

/// A successfully validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    /// Identifier of the stored token record.
    pub token_id: String,
    /// Object the token authorizes a download of.
    pub object: ObjectRef,
    /// Whether the caller must consume the token via
    /// [`TokenValidator::mark_used`] after the download succeeds.
    pub one_time_use: bool,
}

/// Validates presented secrets against stored token digests.
#[derive(Debug)]
pub struct TokenValidator<C: Clock> {
    clock: C,
    config: EngineConfig,
}

impl<C: Clock> TokenValidator<C> {
    /// Creates a validator with the given clock and configuration.
    #[must_use]
    pub fn new(clock: C, config: EngineConfig) -> Self {
        Self { clock, config }
    }

    /// Validates a presented secret for the given tenant.
    ///
    /// Read-only, safe to call repeatedly. A one-time token stays valid
    /// until the caller consumes it with [`Self::mark_used`] after the
    /// download completes.
    ///
    /// Expiry is checked against the configured safety buffer rather than
    /// the bare clock, for both the token and its backing grant. A secret
    /// belonging to another tenant is indistinguishable from an unknown
    /// one.
    ///
    /// # Errors
    ///
    /// Rejections are reported in a fixed order: [`TokenError::InvalidToken`],
    /// [`TokenError::TokenRevoked`], [`TokenError::GrantRevoked`],
    /// [`TokenError::GrantExpired`], [`TokenError::TokenExpired`], then
    /// [`TokenError::AlreadyUsed`].
    pub fn validate<S: Store>(
        &self,
        store: &mut S,
        secret: &str,
        tenant_id: &str,
    ) -> Result<ValidatedToken, TokenError> {
        let now = self.clock.now_secs();
        let buffer_secs = self.config.expiry_safety_buffer_secs;
        let digest = digest_secret(secret);

        store.with_tx(|tx| {
            let token = tx
                .find_token_by_digest(&digest)?
                .filter(|t| t.tenant_id == tenant_id)
                .ok_or(TokenError::InvalidToken)?;

            if token.is_revoked() {
                return Err(TokenError::TokenRevoked);
            }
            if let Some(grant_id) = token.grant_id.as_deref() {
                // A vanished grant row reads the same as a revoked one.
                let grant = tx.get_grant(grant_id)?.ok_or(TokenError::GrantRevoked)?;
                if grant.is_revoked() {
                    return Err(TokenError::GrantRevoked);
                }
                if is_expired_with_buffer(now, grant.expires_at, buffer_secs) {
                    return Err(TokenError::GrantExpired);
                }
            }
            if is_expired_with_buffer(now, Some(token.expires_at), buffer_secs) {
                return Err(TokenError::TokenExpired);
            }
            if token.is_consumed() {
                return Err(TokenError::AlreadyUsed);
            }

            Ok(ValidatedToken {
                token_id: token.token_id,
                object: token.object,
                one_time_use: token.one_time_use,
            })
        })
    }

    /// Records the first use of the token matching `secret`.
    ///
    /// Idempotent: a token that is already marked used is left untouched.
    /// This is what consumes a one-time token; callers invoke it after
    /// the protected download succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidToken`] if no token matches the
    /// secret.
    pub fn mark_used<S: Store>(&self, store: &mut S, secret: &str) -> Result<(), TokenError> {
        let now = self.clock.now_secs();
        let digest = digest_secret(secret);

        store.with_tx(|tx| {
            let token = tx
                .find_token_by_digest(&digest)?
                .ok_or(TokenError::InvalidToken)?;
            if token.used_at.is_some() {
                return Ok(());
            }
            tx.mark_token_used(&token.token_id, now)?;
            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    token.object.clone(),
                    AuditAction::MarkUsed,
                    token.issued_to_user_id.clone(),
                    token.tenant_id.clone(),
                    json!({ "token_id": token.token_id }),
                ),
                now,
            );
            Ok(())
        })
    }

    /// Deletes expired tokens that were never used and never revoked,
    /// returning how many were removed.
    ///
    /// Used and revoked tokens are kept as evidence regardless of age;
    /// the audit trail references them. Expiry here is the bare deadline,
    /// without the validation-time safety buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn purge_expired<S: Store>(&self, store: &mut S) -> Result<u64, TokenError> {
        let cutoff = self.clock.now_secs();
        let purged = store.with_tx(|tx| Ok::<_, TokenError>(tx.purge_expired_tokens(cutoff)?))?;
        if purged > 0 {
            debug!(purged, "purged expired download tokens");
        }
        Ok(purged)
    }
}

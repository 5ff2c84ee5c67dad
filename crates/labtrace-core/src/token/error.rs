//! Token issuance and validation errors.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`TokenIssuer`](super::TokenIssuer) and
/// [`TokenValidator`](super::TokenValidator).
///
/// Every validation variant is terminal for the presented secret. The
/// caller must go through a fresh authorization flow rather than retry
/// with the same token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// No token of this tenant matches the presented secret.
    #[error("invalid token")]
    InvalidToken,

    /// The token was explicitly revoked.
    #[error("token has been revoked")]
    TokenRevoked,

    /// The grant backing the token is missing or revoked.
    #[error("backing access grant has been revoked")]
    GrantRevoked,

    /// The grant backing the token has lapsed, safety buffer included.
    #[error("backing access grant has expired")]
    GrantExpired,

    /// The token has lapsed, safety buffer included.
    #[error("token has expired")]
    TokenExpired,

    /// The one-time token was already consumed.
    #[error("one-time token already used")]
    AlreadyUsed,

    /// The configured secret length does not reach the entropy floor.
    #[error("secret length {len} below minimum {min}")]
    SecretTooShort {
        /// Configured secret length in bytes.
        len: usize,
        /// Minimum acceptable length in bytes.
        min: usize,
    },

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

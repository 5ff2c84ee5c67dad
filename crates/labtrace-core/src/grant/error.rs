//! Grant management errors.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by grant creation and revocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GrantError {
    /// No un-revoked grant matches the (object, grantee) pair.
    ///
    /// Surfaced distinctly from a generic not-found so a double
    /// revocation shows up as itself instead of masquerading as a
    /// missing object.
    #[error("no active grant for this object and grantee")]
    GrantNotFound,

    /// An un-revoked grant already exists for the (object, grantee) pair.
    #[error("grant already exists for object {object_id}")]
    AlreadyGranted {
        /// Object the existing grant covers.
        object_id: String,
    },

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

//! Lineage error taxonomy.

use thiserror::Error;

use super::record::ActorRole;
use crate::store::StoreError;

/// Errors surfaced by lineage validation and mutation.
///
/// Everything except [`LineageError::Store`] is a validation rejection:
/// a pure return value the caller maps to a 4xx-equivalent outcome and
/// never retries without changing input. Store failures are
/// infrastructure errors and fail the whole operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LineageError {
    /// The referenced parent derivation does not exist or is deleted.
    #[error("parent derivation not found")]
    ParentNotFound,

    /// The derivation would exceed the maximum chain depth.
    #[error("derivation depth {depth} exceeds maximum {max}")]
    DepthExceeded {
        /// Depth the new node would have.
        depth: u8,
        /// Configured maximum depth.
        max: u8,
    },

    /// The derivation source is the chain's own root.
    #[error("circular reference: {source_id} is the chain's root")]
    CircularReference {
        /// The offending source id.
        source_id: String,
    },

    /// Active derived samples still depend on the deletion target.
    #[error("{dependent_count} active derived samples depend on the target")]
    HasDependents {
        /// Number of active dependents found.
        dependent_count: u64,
    },

    /// The actor's role does not permit the operation.
    #[error("operation requires the {required} role")]
    Unauthorized {
        /// Role the operation requires.
        required: ActorRole,
    },

    /// The target sample or derived sample does not exist or is already
    /// deleted.
    #[error("sample not found: {id}")]
    NotFound {
        /// The id that failed to resolve.
        id: String,
    },

    /// A sample or derived sample with this id already exists.
    #[error("sample already exists: {id}")]
    DuplicateSample {
        /// The colliding id.
        id: String,
    },

    /// The persistence layer failed; the operation was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

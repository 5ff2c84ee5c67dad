//! Pure derivation validation.
//!
//! Computes where a new derived sample would sit in its lineage chain and
//! rejects placements that violate the chain invariants. No side effects;
//! the engine persists a node only after acceptance.

use super::error::LineageError;
use super::record::DerivedSampleRecord;

/// Accepted placement of a new derived sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPlacement {
    /// Root sample the new node's chain descends from.
    pub root_sample_id: String,
    /// Depth the new node will carry.
    pub depth: u8,
}

/// Validates a candidate derivation and computes its placement.
///
/// With no parent the node derives directly from a root sample: the chain
/// root is `source_id` itself and depth is `0`. Whether that root exists
/// is the caller's concern.
///
/// With a parent, the new node inherits the parent's chain root and sits
/// one generation deeper. Rejections, in check order:
///
/// - the parent is soft-deleted (a tombstone cannot be extended);
/// - the new depth exceeds `max_depth`;
/// - `source_id` equals the chain's root (re-deriving from the root the
///   chain already descends from would close a cycle).
///
/// # Errors
///
/// Returns [`LineageError::ParentNotFound`], [`LineageError::DepthExceeded`],
/// or [`LineageError::CircularReference`] as described above.
pub fn validate_derivation(
    source_id: &str,
    parent: Option<&DerivedSampleRecord>,
    max_depth: u8,
) -> Result<DerivationPlacement, LineageError> {
    let Some(parent) = parent else {
        return Ok(DerivationPlacement {
            root_sample_id: source_id.to_owned(),
            depth: 0,
        });
    };

    if !parent.is_active() {
        return Err(LineageError::ParentNotFound);
    }

    let depth = parent.depth.saturating_add(1);
    if depth > max_depth {
        return Err(LineageError::DepthExceeded {
            depth,
            max: max_depth,
        });
    }

    if source_id == parent.root_sample_id {
        return Err(LineageError::CircularReference {
            source_id: source_id.to_owned(),
        });
    }

    Ok(DerivationPlacement {
        root_sample_id: parent.root_sample_id.clone(),
        depth,
    })
}

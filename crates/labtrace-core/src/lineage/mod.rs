//! Sample lineage tracking.
//!
//! Root samples spawn chains of derived samples (aliquots, extracts,
//! preparations). Chains are at most three derivation levels deep, every
//! node carries a direct pointer to its chain root, and deletion is a
//! tombstone so audit history stays resolvable. [`LineageEngine`] is the
//! entry point; [`validate_derivation`] is the pure placement check it
//! applies inside each transaction.

mod engine;
mod error;
mod record;
mod validator;

#[cfg(test)]
mod tests;

pub use engine::LineageEngine;
pub use error::LineageError;
pub use record::{ActorRole, DeletionCheck, DerivedSampleRecord, LifecycleState, SampleRecord};
pub use validator::{validate_derivation, DerivationPlacement};

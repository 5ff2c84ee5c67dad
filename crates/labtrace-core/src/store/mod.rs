//! Persistence contract and backends.
//!
//! The engine owns no connection pool or process-wide state. Every
//! operation takes a [`Store`] handle and runs inside one closure-scoped
//! transaction: commit on `Ok`, complete rollback on `Err`. That single
//! rule is what gives cascade deletion and grant revocation their
//! all-or-nothing semantics, and what makes a concurrent reader unable to
//! observe a partially applied multi-step update.
//!
//! [`StoreTx`] is the typed row-operation surface over the five relations
//! (samples, derived samples, access grants, download tokens, audit log).
//! Two backends implement the contract:
//!
//! - [`MemoryStore`] — `BTreeMap` tables with stage-and-swap commit; used
//!   by unit tests and embeddable callers.
//! - [`SqliteStore`] — `rusqlite` with WAL mode and an embedded schema.

mod memory;
mod sqlite;


pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::audit::{AuditEntryRecord, AuditHash, PendingAuditEntry};
use crate::grant::AccessGrantRecord;
use crate::lineage::{DerivedSampleRecord, SampleRecord};
use crate::object::ObjectRef;
use crate::token::DownloadTokenRecord;

/// Errors surfaced by the persistence layer.
///
/// These are infrastructure failures, not validation rejections: they
/// propagate unchanged and fail the whole enclosing operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {detail}")]
    Serialization {
        /// What failed to round-trip.
        detail: String,
    },

    /// An insert collided with an existing row.
    #[error("conflict: {detail}")]
    Conflict {
        /// The colliding key.
        detail: String,
    },

    /// A row expected to exist was missing.
    #[error("{entity} not found")]
    NotFound {
        /// The relation the row was expected in.
        entity: &'static str,
    },

    /// The audit log rejected an append.
    #[error("audit append failed: {detail}")]
    AuditAppend {
        /// Backend-specific failure description.
        detail: String,
    },
}

/// Transaction-scoped row operations.
///
/// All reads and writes inside one [`Store::with_tx`] closure observe and
/// mutate the same isolated snapshot. Implementations never interpret
/// domain rules; depth checks, expiry buffers, and revocation ordering
/// live in the engines.
pub trait StoreTx {
    // ------------------------------------------------------------------
    // Samples
    // ------------------------------------------------------------------

    /// Inserts a root sample row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the id already exists for the
    /// tenant.
    fn insert_sample(&mut self, record: &SampleRecord) -> Result<(), StoreError>;

    /// Fetches a sample by tenant and id, in any lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_sample(
        &mut self,
        tenant_id: &str,
        sample_id: &str,
    ) -> Result<Option<SampleRecord>, StoreError>;

    /// Stamps a sample's tombstone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such row exists.
    fn mark_sample_deleted(
        &mut self,
        tenant_id: &str,
        sample_id: &str,
        deleted_at: u64,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Derived samples
    // ------------------------------------------------------------------

    /// Inserts a derived sample row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the id already exists for the
    /// tenant.
    fn insert_derived(&mut self, record: &DerivedSampleRecord) -> Result<(), StoreError>;

    /// Fetches a derived sample by tenant and id, in any lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_derived(
        &mut self,
        tenant_id: &str,
        derived_id: &str,
    ) -> Result<Option<DerivedSampleRecord>, StoreError>;

    /// Stamps a derived sample's tombstone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such row exists.
    fn mark_derived_deleted(
        &mut self,
        tenant_id: &str,
        derived_id: &str,
        deleted_at: u64,
    ) -> Result<(), StoreError>;

    /// Counts active derived samples whose chain root or immediate parent
    /// is the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn count_active_dependents(&mut self, tenant_id: &str, id: &str) -> Result<u64, StoreError>;

    /// Lists all active derived samples sharing the given chain root.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn active_descendants_of_root(
        &mut self,
        tenant_id: &str,
        root_sample_id: &str,
    ) -> Result<Vec<DerivedSampleRecord>, StoreError>;

    // ------------------------------------------------------------------
    // Access grants
    // ------------------------------------------------------------------

    /// Inserts a grant row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the grant id already exists.
    fn insert_grant(&mut self, record: &AccessGrantRecord) -> Result<(), StoreError>;

    /// Fetches a grant by id, revoked or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_grant(&mut self, grant_id: &str) -> Result<Option<AccessGrantRecord>, StoreError>;

    /// Finds the un-revoked grant for an (object, grantee) pair, if any.
    ///
    /// At most one un-revoked grant exists per pair; the engine enforces
    /// this at creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn find_active_grant(
        &mut self,
        object: &ObjectRef,
        granted_to_org_id: &str,
    ) -> Result<Option<AccessGrantRecord>, StoreError>;

    /// Lists every grant ever minted for an object, revoked ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn grants_for_object(
        &mut self,
        object: &ObjectRef,
    ) -> Result<Vec<AccessGrantRecord>, StoreError>;

    /// Stamps a grant's revocation fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such row exists.
    fn mark_grant_revoked(
        &mut self,
        grant_id: &str,
        revoked_at: u64,
        reason: &str,
        revoked_by: &str,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Download tokens
    // ------------------------------------------------------------------

    /// Inserts a token row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the token id already exists.
    fn insert_token(&mut self, record: &DownloadTokenRecord) -> Result<(), StoreError>;

    /// Finds a token by secret digest.
    ///
    /// Implementations compare digests in constant time before returning a
    /// row.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn find_token_by_digest(
        &mut self,
        digest: &[u8; 32],
    ) -> Result<Option<DownloadTokenRecord>, StoreError>;

    /// Lists tokens issued under a grant, in issuance order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn tokens_for_grant(
        &mut self,
        grant_id: &str,
    ) -> Result<Vec<DownloadTokenRecord>, StoreError>;

    /// Stamps a token's first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such row exists.
    fn mark_token_used(&mut self, token_id: &str, used_at: u64) -> Result<(), StoreError>;

    /// Stamps a token's revocation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such row exists.
    fn mark_token_revoked(&mut self, token_id: &str, revoked_at: u64) -> Result<(), StoreError>;

    /// Deletes token rows whose expiry passed before `cutoff` and that
    /// carry no usage or revocation evidence. Returns the number deleted.
    ///
    /// Used and revoked rows are retained regardless of age.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn purge_expired_tokens(&mut self, cutoff: u64) -> Result<u64, StoreError>;

    // ------------------------------------------------------------------
    // Audit log
    // ------------------------------------------------------------------

    /// Appends a sealed audit entry and returns its assigned sequence id.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails.
    fn append_audit(&mut self, entry: &PendingAuditEntry) -> Result<u64, StoreError>;

    /// Returns the entry hash at the head of the audit log, or the genesis
    /// hash when the log is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn audit_head_hash(&mut self) -> Result<AuditHash, StoreError>;

    /// Reads the complete audit log in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn audit_entries(&mut self) -> Result<Vec<AuditEntryRecord>, StoreError>;

    /// Reads the audit entries recorded for one object, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn audit_entries_for_object(
        &mut self,
        object: &ObjectRef,
    ) -> Result<Vec<AuditEntryRecord>, StoreError>;
}

/// A persistence handle the engine threads through every operation.
pub trait Store {
    /// Runs `f` inside one transaction: commit on `Ok`, complete rollback
    /// on `Err`.
    ///
    /// Domain errors flow through unchanged; any of the engine error types
    /// can be the closure's error as long as it can absorb a
    /// [`StoreError`] raised while opening or committing the transaction.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a converted [`StoreError`] if the
    /// transaction itself cannot be opened or committed.
    fn with_tx<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>;
}

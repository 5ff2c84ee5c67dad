#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! labtrace-core - Lineage Integrity & Access-Revocation Engine
//!
//! This library is the trust core of the LabTrace sample-tracking platform.
//! It maintains the derivation graph of laboratory samples under strict depth
//! and cycle invariants, and it issues, validates, and revokes time-limited
//! cross-organization download tokens with race-safe expiry semantics and a
//! tamper-evident audit trail.
//!
//! The HTTP layer, UI, billing, and notification delivery live elsewhere and
//! consume this crate as a plain library: every operation takes caller
//! identity and object identifiers as plain data and a persistence handle as
//! an explicit parameter. The crate holds no process-wide state.
//!
//! # Modules
//!
//! - [`lineage`]: derivation-graph validation, soft-delete lifecycle, cascade
//!   delete, and breadth-first chain traversal
//! - [`token`]: download-token issuance (digest-only persistence), validation
//!   with a safety-buffered expiry check, and one-time-use enforcement
//! - [`grant`]: cross-organization access grants and the revocation
//!   coordinator that cascades revocation to dependent tokens atomically
//! - [`audit`]: append-only, hash-chained audit entries with best-effort and
//!   transactional recording paths
//! - [`store`]: the persistence contract ([`store::Store`] /
//!   [`store::StoreTx`]) with SQLite and in-memory backends
//! - [`clock`]: injected time source for deterministic expiry testing
//! - [`config`]: engine tuning knobs with serde-loadable defaults
//!
//! # Concurrency Model
//!
//! The engine has no scheduler of its own; it runs request-per-call against
//! shared persisted state. Every operation executes inside exactly one store
//! transaction ([`store::Store::with_tx`]), so multi-step updates such as
//! grant revocation are all-or-nothing and concurrent readers never observe
//! partial state. No operation blocks indefinitely and no long-lived locks
//! are taken.

pub mod audit;
pub mod clock;
pub mod config;
pub mod grant;
pub mod lineage;
pub mod object;
pub mod store;
pub mod token;

pub use crate::audit::{AuditAction, AuditEntryRecord, RequestMeta};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::EngineConfig;
pub use crate::grant::{
    AccessGrantRecord, CreateGrantRequest, GrantError, GrantRole, RevocationCoordinator,
    RevokeGrantRequest,
};
pub use crate::lineage::{
    ActorRole, DeletionCheck, DerivedSampleRecord, LifecycleState, LineageEngine, LineageError,
    SampleRecord,
};
pub use crate::object::{ObjectRef, ObjectType};
pub use crate::store::{MemoryStore, SqliteStore, Store, StoreError, StoreTx};
pub use crate::token::{
    DownloadTokenRecord, IssueRequest, IssuedToken, TokenError, TokenIssuer, TokenValidator,
    ValidatedToken,
};

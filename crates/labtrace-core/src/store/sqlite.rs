//! `SQLite`-backed store.
//!
//! Uses WAL mode so readers proceed while a write transaction is open.
//! The schema is embedded at compile time and applied idempotently on
//! open. [`Store::with_tx`] maps directly onto a `rusqlite` transaction:
//! the closure's failure rolls the transaction back via drop.

// SQLite returns i64 for row IDs, counts, and timestamps, but ours are
// always non-negative and far below the i64 range.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{Store, StoreError, StoreTx};
use crate::audit::{
    AuditAction, AuditEntryRecord, AuditHash, PendingAuditEntry, RequestMeta, GENESIS_PREV_HASH,
};
use crate::grant::{AccessGrantRecord, GrantRole};
use crate::lineage::{DerivedSampleRecord, LifecycleState, SampleRecord};
use crate::object::{ObjectRef, ObjectType};
use crate::token::digest_eq;
use crate::token::DownloadTokenRecord;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// `SQLite`-backed [`Store`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a store at the given path.
    ///
    /// The schema is applied if missing and WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::initialize(conn)
    }

    /// Creates an in-memory store for tests and embeddable callers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        // Schema includes the PRAGMA statements.
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn with_tx<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| E::from(StoreError::from(e)))?;
        let mut scope = SqliteTx { tx };
        let value = f(&mut scope)?;
        scope
            .tx
            .commit()
            .map_err(|e| E::from(StoreError::from(e)))?;
        Ok(value)
    }
}

/// One open transaction. Dropping without commit rolls back.
struct SqliteTx<'c> {
    tx: rusqlite::Transaction<'c>,
}

// ---------------------------------------------------------------------
// Row shapes and converters
// ---------------------------------------------------------------------

struct DerivedRow {
    derived_id: String,
    tenant_id: String,
    root_sample_id: String,
    parent_id: Option<String>,
    depth: i64,
    status: String,
    created_at: i64,
    deleted_at: Option<i64>,
}

struct GrantRow {
    grant_id: String,
    object_type: String,
    object_id: String,
    owner_tenant_id: String,
    granted_to_org_id: String,
    granted_role: String,
    can_reshare: bool,
    created_at: i64,
    expires_at: Option<i64>,
    revoked_at: Option<i64>,
    revocation_reason: Option<String>,
    revoked_by: Option<String>,
}

struct TokenRow {
    token_id: String,
    digest: Vec<u8>,
    object_type: String,
    object_id: String,
    tenant_id: String,
    issued_to_user_id: String,
    grant_id: Option<String>,
    issued_at: i64,
    expires_at: i64,
    one_time_use: bool,
    used_at: Option<i64>,
    revoked_at: Option<i64>,
}

struct AuditRow {
    seq_id: i64,
    object_type: String,
    object_id: String,
    action: String,
    actor_id: String,
    tenant_id: String,
    detail: String,
    recorded_at: i64,
    ip: Option<String>,
    user_agent: Option<String>,
    prev_hash: Vec<u8>,
    entry_hash: Vec<u8>,
}

fn parse_state(s: &str) -> Result<LifecycleState, StoreError> {
    LifecycleState::parse(s).ok_or_else(|| StoreError::Serialization {
        detail: format!("unknown lifecycle state: {s}"),
    })
}

fn parse_role(s: &str) -> Result<GrantRole, StoreError> {
    GrantRole::parse(s).ok_or_else(|| StoreError::Serialization {
        detail: format!("unknown grant role: {s}"),
    })
}

fn parse_action(s: &str) -> Result<AuditAction, StoreError> {
    AuditAction::parse(s).ok_or_else(|| StoreError::Serialization {
        detail: format!("unknown audit action: {s}"),
    })
}

fn object_from_parts(object_type: &str, object_id: String) -> Result<ObjectRef, StoreError> {
    let object_type = ObjectType::parse(object_type).ok_or_else(|| StoreError::Serialization {
        detail: format!("unknown object type: {object_type}"),
    })?;
    Ok(ObjectRef {
        object_type,
        object_id,
    })
}

fn hash_from_blob(bytes: Vec<u8>) -> Result<AuditHash, StoreError> {
    AuditHash::try_from(bytes).map_err(|b| StoreError::Serialization {
        detail: format!("expected 32-byte hash, got {} bytes", b.len()),
    })
}

fn derived_from_row(row: DerivedRow) -> Result<DerivedSampleRecord, StoreError> {
    Ok(DerivedSampleRecord {
        derived_id: row.derived_id,
        tenant_id: row.tenant_id,
        root_sample_id: row.root_sample_id,
        parent_id: row.parent_id,
        depth: row.depth as u8,
        status: parse_state(&row.status)?,
        created_at: row.created_at as u64,
        deleted_at: row.deleted_at.map(|t| t as u64),
    })
}

fn grant_from_row(row: GrantRow) -> Result<AccessGrantRecord, StoreError> {
    Ok(AccessGrantRecord {
        grant_id: row.grant_id,
        object: object_from_parts(&row.object_type, row.object_id)?,
        owner_tenant_id: row.owner_tenant_id,
        granted_to_org_id: row.granted_to_org_id,
        granted_role: parse_role(&row.granted_role)?,
        can_reshare: row.can_reshare,
        created_at: row.created_at as u64,
        expires_at: row.expires_at.map(|t| t as u64),
        revoked_at: row.revoked_at.map(|t| t as u64),
        revocation_reason: row.revocation_reason,
        revoked_by: row.revoked_by,
    })
}

fn token_from_row(row: TokenRow) -> Result<DownloadTokenRecord, StoreError> {
    Ok(DownloadTokenRecord {
        token_id: row.token_id,
        digest: hash_from_blob(row.digest)?,
        object: object_from_parts(&row.object_type, row.object_id)?,
        tenant_id: row.tenant_id,
        issued_to_user_id: row.issued_to_user_id,
        grant_id: row.grant_id,
        issued_at: row.issued_at as u64,
        expires_at: row.expires_at as u64,
        one_time_use: row.one_time_use,
        used_at: row.used_at.map(|t| t as u64),
        revoked_at: row.revoked_at.map(|t| t as u64),
    })
}

fn audit_from_row(row: AuditRow) -> Result<AuditEntryRecord, StoreError> {
    Ok(AuditEntryRecord {
        seq_id: row.seq_id as u64,
        object: object_from_parts(&row.object_type, row.object_id)?,
        action: parse_action(&row.action)?,
        actor_id: row.actor_id,
        tenant_id: row.tenant_id,
        detail: serde_json::from_str(&row.detail).map_err(|e| StoreError::Serialization {
            detail: format!("audit detail: {e}"),
        })?,
        recorded_at: row.recorded_at as u64,
        request_meta: RequestMeta {
            ip: row.ip,
            user_agent: row.user_agent,
        },
        prev_hash: hash_from_blob(row.prev_hash)?,
        entry_hash: hash_from_blob(row.entry_hash)?,
    })
}

fn read_grant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GrantRow> {
    Ok(GrantRow {
        grant_id: row.get(0)?,
        object_type: row.get(1)?,
        object_id: row.get(2)?,
        owner_tenant_id: row.get(3)?,
        granted_to_org_id: row.get(4)?,
        granted_role: row.get(5)?,
        can_reshare: row.get(6)?,
        created_at: row.get(7)?,
        expires_at: row.get(8)?,
        revoked_at: row.get(9)?,
        revocation_reason: row.get(10)?,
        revoked_by: row.get(11)?,
    })
}

fn read_token_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TokenRow> {
    Ok(TokenRow {
        token_id: row.get(0)?,
        digest: row.get(1)?,
        object_type: row.get(2)?,
        object_id: row.get(3)?,
        tenant_id: row.get(4)?,
        issued_to_user_id: row.get(5)?,
        grant_id: row.get(6)?,
        issued_at: row.get(7)?,
        expires_at: row.get(8)?,
        one_time_use: row.get(9)?,
        used_at: row.get(10)?,
        revoked_at: row.get(11)?,
    })
}

fn read_audit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        seq_id: row.get(0)?,
        object_type: row.get(1)?,
        object_id: row.get(2)?,
        action: row.get(3)?,
        actor_id: row.get(4)?,
        tenant_id: row.get(5)?,
        detail: row.get(6)?,
        recorded_at: row.get(7)?,
        ip: row.get(8)?,
        user_agent: row.get(9)?,
        prev_hash: row.get(10)?,
        entry_hash: row.get(11)?,
    })
}

/// Maps a unique-constraint failure to [`StoreError::Conflict`].
fn conflict_or(error: rusqlite::Error, detail: String) -> StoreError {
    match error {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict { detail }
        }
        other => StoreError::Sqlite(other),
    }
}

const GRANT_COLUMNS: &str = "grant_id, object_type, object_id, owner_tenant_id, \
     granted_to_org_id, granted_role, can_reshare, created_at, expires_at, \
     revoked_at, revocation_reason, revoked_by";

const TOKEN_COLUMNS: &str = "token_id, digest, object_type, object_id, tenant_id, \
     issued_to_user_id, grant_id, issued_at, expires_at, one_time_use, used_at, \
     revoked_at";

const AUDIT_COLUMNS: &str = "seq_id, object_type, object_id, action, actor_id, \
     tenant_id, detail, recorded_at, ip, user_agent, prev_hash, entry_hash";

impl SqliteTx<'_> {
    fn audit_query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<AuditEntryRecord>, StoreError> {
        let mut stmt = self.tx.prepare(sql)?;
        let rows = stmt
            .query_map(params, read_audit_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(audit_from_row).collect()
    }
}

impl StoreTx for SqliteTx<'_> {
    fn insert_sample(&mut self, record: &SampleRecord) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO samples (sample_id, tenant_id, status, created_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.sample_id,
                    record.tenant_id,
                    record.status.as_str(),
                    record.created_at,
                    record.deleted_at,
                ],
            )
            .map_err(|e| {
                conflict_or(e, format!("sample {}/{}", record.tenant_id, record.sample_id))
            })?;
        Ok(())
    }

    fn get_sample(
        &mut self,
        tenant_id: &str,
        sample_id: &str,
    ) -> Result<Option<SampleRecord>, StoreError> {
        let row = self
            .tx
            .query_row(
                "SELECT sample_id, tenant_id, status, created_at, deleted_at
                 FROM samples WHERE tenant_id = ?1 AND sample_id = ?2",
                params![tenant_id, sample_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(sample_id, tenant_id, status, created_at, deleted_at)| {
            Ok(SampleRecord {
                sample_id,
                tenant_id,
                status: parse_state(&status)?,
                created_at: created_at as u64,
                deleted_at: deleted_at.map(|t| t as u64),
            })
        })
        .transpose()
    }

    fn mark_sample_deleted(
        &mut self,
        tenant_id: &str,
        sample_id: &str,
        deleted_at: u64,
    ) -> Result<(), StoreError> {
        let updated = self.tx.execute(
            "UPDATE samples SET status = ?1, deleted_at = ?2
             WHERE tenant_id = ?3 AND sample_id = ?4",
            params![
                LifecycleState::Deleted.as_str(),
                deleted_at,
                tenant_id,
                sample_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound { entity: "sample" });
        }
        Ok(())
    }

    fn insert_derived(&mut self, record: &DerivedSampleRecord) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO derived_samples (derived_id, tenant_id, root_sample_id, \
                 parent_id, depth, status, created_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.derived_id,
                    record.tenant_id,
                    record.root_sample_id,
                    record.parent_id,
                    record.depth,
                    record.status.as_str(),
                    record.created_at,
                    record.deleted_at,
                ],
            )
            .map_err(|e| {
                conflict_or(
                    e,
                    format!("derived sample {}/{}", record.tenant_id, record.derived_id),
                )
            })?;
        Ok(())
    }

    fn get_derived(
        &mut self,
        tenant_id: &str,
        derived_id: &str,
    ) -> Result<Option<DerivedSampleRecord>, StoreError> {
        let row = self
            .tx
            .query_row(
                "SELECT derived_id, tenant_id, root_sample_id, parent_id, depth, \
                 status, created_at, deleted_at
                 FROM derived_samples WHERE tenant_id = ?1 AND derived_id = ?2",
                params![tenant_id, derived_id],
                |row| {
                    Ok(DerivedRow {
                        derived_id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        root_sample_id: row.get(2)?,
                        parent_id: row.get(3)?,
                        depth: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                        deleted_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        row.map(derived_from_row).transpose()
    }

    fn mark_derived_deleted(
        &mut self,
        tenant_id: &str,
        derived_id: &str,
        deleted_at: u64,
    ) -> Result<(), StoreError> {
        let updated = self.tx.execute(
            "UPDATE derived_samples SET status = ?1, deleted_at = ?2
             WHERE tenant_id = ?3 AND derived_id = ?4",
            params![
                LifecycleState::Deleted.as_str(),
                deleted_at,
                tenant_id,
                derived_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "derived sample",
            });
        }
        Ok(())
    }

    fn count_active_dependents(&mut self, tenant_id: &str, id: &str) -> Result<u64, StoreError> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM derived_samples
             WHERE tenant_id = ?1 AND status = ?2
               AND (root_sample_id = ?3 OR parent_id = ?3)",
            params![tenant_id, LifecycleState::Active.as_str(), id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn active_descendants_of_root(
        &mut self,
        tenant_id: &str,
        root_sample_id: &str,
    ) -> Result<Vec<DerivedSampleRecord>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT derived_id, tenant_id, root_sample_id, parent_id, depth, \
             status, created_at, deleted_at
             FROM derived_samples
             WHERE tenant_id = ?1 AND status = ?2 AND root_sample_id = ?3
             ORDER BY derived_id ASC",
        )?;
        let rows = stmt
            .query_map(
                params![tenant_id, LifecycleState::Active.as_str(), root_sample_id],
                |row| {
                    Ok(DerivedRow {
                        derived_id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        root_sample_id: row.get(2)?,
                        parent_id: row.get(3)?,
                        depth: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                        deleted_at: row.get(7)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(derived_from_row).collect()
    }

    fn insert_grant(&mut self, record: &AccessGrantRecord) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO access_grants (grant_id, object_type, object_id, \
                 owner_tenant_id, granted_to_org_id, granted_role, can_reshare, \
                 created_at, expires_at, revoked_at, revocation_reason, revoked_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.grant_id,
                    record.object.object_type.as_str(),
                    record.object.object_id,
                    record.owner_tenant_id,
                    record.granted_to_org_id,
                    record.granted_role.as_str(),
                    record.can_reshare,
                    record.created_at,
                    record.expires_at,
                    record.revoked_at,
                    record.revocation_reason,
                    record.revoked_by,
                ],
            )
            .map_err(|e| conflict_or(e, format!("grant {}", record.grant_id)))?;
        Ok(())
    }

    fn get_grant(&mut self, grant_id: &str) -> Result<Option<AccessGrantRecord>, StoreError> {
        let row = self
            .tx
            .query_row(
                &format!("SELECT {GRANT_COLUMNS} FROM access_grants WHERE grant_id = ?1"),
                params![grant_id],
                read_grant_row,
            )
            .optional()?;
        row.map(grant_from_row).transpose()
    }

    fn find_active_grant(
        &mut self,
        object: &ObjectRef,
        granted_to_org_id: &str,
    ) -> Result<Option<AccessGrantRecord>, StoreError> {
        let row = self
            .tx
            .query_row(
                &format!(
                    "SELECT {GRANT_COLUMNS} FROM access_grants
                     WHERE object_type = ?1 AND object_id = ?2
                       AND granted_to_org_id = ?3 AND revoked_at IS NULL
                     LIMIT 1"
                ),
                params![
                    object.object_type.as_str(),
                    object.object_id,
                    granted_to_org_id
                ],
                read_grant_row,
            )
            .optional()?;
        row.map(grant_from_row).transpose()
    }

    fn grants_for_object(
        &mut self,
        object: &ObjectRef,
    ) -> Result<Vec<AccessGrantRecord>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants
             WHERE object_type = ?1 AND object_id = ?2
             ORDER BY created_at ASC, grant_id ASC"
        ))?;
        let rows = stmt
            .query_map(
                params![object.object_type.as_str(), object.object_id],
                read_grant_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(grant_from_row).collect()
    }

    fn mark_grant_revoked(
        &mut self,
        grant_id: &str,
        revoked_at: u64,
        reason: &str,
        revoked_by: &str,
    ) -> Result<(), StoreError> {
        let updated = self.tx.execute(
            "UPDATE access_grants
             SET revoked_at = ?1, revocation_reason = ?2, revoked_by = ?3
             WHERE grant_id = ?4",
            params![revoked_at, reason, revoked_by, grant_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "access grant",
            });
        }
        Ok(())
    }

    fn insert_token(&mut self, record: &DownloadTokenRecord) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO download_tokens (token_id, digest, object_type, object_id, \
                 tenant_id, issued_to_user_id, grant_id, issued_at, expires_at, \
                 one_time_use, used_at, revoked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.token_id,
                    &record.digest[..],
                    record.object.object_type.as_str(),
                    record.object.object_id,
                    record.tenant_id,
                    record.issued_to_user_id,
                    record.grant_id,
                    record.issued_at,
                    record.expires_at,
                    record.one_time_use,
                    record.used_at,
                    record.revoked_at,
                ],
            )
            .map_err(|e| conflict_or(e, format!("token {}", record.token_id)))?;
        Ok(())
    }

    fn find_token_by_digest(
        &mut self,
        digest: &[u8; 32],
    ) -> Result<Option<DownloadTokenRecord>, StoreError> {
        let row = self
            .tx
            .query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM download_tokens WHERE digest = ?1"),
                params![&digest[..]],
                read_token_row,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = token_from_row(row)?;
        // The index narrows the candidate; the match itself is re-checked
        // in constant time.
        if digest_eq(&record.digest, digest) {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    fn tokens_for_grant(
        &mut self,
        grant_id: &str,
    ) -> Result<Vec<DownloadTokenRecord>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM download_tokens
             WHERE grant_id = ?1
             ORDER BY issued_at ASC, token_id ASC"
        ))?;
        let rows = stmt
            .query_map(params![grant_id], read_token_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(token_from_row).collect()
    }

    fn mark_token_used(&mut self, token_id: &str, used_at: u64) -> Result<(), StoreError> {
        let updated = self.tx.execute(
            "UPDATE download_tokens SET used_at = ?1 WHERE token_id = ?2",
            params![used_at, token_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "download token",
            });
        }
        Ok(())
    }

    fn mark_token_revoked(&mut self, token_id: &str, revoked_at: u64) -> Result<(), StoreError> {
        let updated = self.tx.execute(
            "UPDATE download_tokens SET revoked_at = ?1 WHERE token_id = ?2",
            params![revoked_at, token_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "download token",
            });
        }
        Ok(())
    }

    fn purge_expired_tokens(&mut self, cutoff: u64) -> Result<u64, StoreError> {
        let deleted = self.tx.execute(
            "DELETE FROM download_tokens
             WHERE expires_at < ?1 AND used_at IS NULL AND revoked_at IS NULL",
            params![cutoff],
        )?;
        Ok(deleted as u64)
    }

    fn append_audit(&mut self, entry: &PendingAuditEntry) -> Result<u64, StoreError> {
        let detail = serde_json::to_string(&entry.detail).map_err(|e| {
            StoreError::Serialization {
                detail: format!("audit detail: {e}"),
            }
        })?;
        self.tx
            .execute(
                "INSERT INTO audit_log (object_type, object_id, action, actor_id, \
                 tenant_id, detail, recorded_at, ip, user_agent, prev_hash, entry_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    entry.object.object_type.as_str(),
                    entry.object.object_id,
                    entry.action.as_str(),
                    entry.actor_id,
                    entry.tenant_id,
                    detail,
                    entry.recorded_at,
                    entry.request_meta.ip,
                    entry.request_meta.user_agent,
                    &entry.prev_hash[..],
                    &entry.entry_hash[..],
                ],
            )
            .map_err(|e| StoreError::AuditAppend {
                detail: e.to_string(),
            })?;
        Ok(self.tx.last_insert_rowid() as u64)
    }

    fn audit_head_hash(&mut self) -> Result<AuditHash, StoreError> {
        let head: Option<Vec<u8>> = self
            .tx
            .query_row(
                "SELECT entry_hash FROM audit_log ORDER BY seq_id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match head {
            None => Ok(GENESIS_PREV_HASH),
            Some(bytes) => hash_from_blob(bytes),
        }
    }

    fn audit_entries(&mut self) -> Result<Vec<AuditEntryRecord>, StoreError> {
        self.audit_query(
            &format!("SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY seq_id ASC"),
            [],
        )
    }

    fn audit_entries_for_object(
        &mut self,
        object: &ObjectRef,
    ) -> Result<Vec<AuditEntryRecord>, StoreError> {
        self.audit_query(
            &format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_log
                 WHERE object_type = ?1 AND object_id = ?2
                 ORDER BY seq_id ASC"
            ),
            params![object.object_type.as_str(), object.object_id],
        )
    }
}

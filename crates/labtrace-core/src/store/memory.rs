//! In-memory backend backed by `BTreeMap` tables.
//!
//! `with_tx` stages a full copy of the tables and swaps it in only when
//! the closure succeeds, so an aborted transaction leaves the store
//! byte-for-byte untouched. Intended for tests and embeddable callers;
//! the copy cost is irrelevant at those scales.

use std::collections::BTreeMap;

use super::{Store, StoreError, StoreTx};
use crate::audit::{AuditEntryRecord, AuditHash, PendingAuditEntry, GENESIS_PREV_HASH};
use crate::grant::AccessGrantRecord;
use crate::lineage::{DerivedSampleRecord, LifecycleState, SampleRecord};
use crate::object::ObjectRef;
use crate::token::digest_eq;
use crate::token::DownloadTokenRecord;

/// Table set; keys are `(tenant_id, row_id)` for tenant-scoped relations.
#[derive(Debug, Clone, Default)]
struct Tables {
    samples: BTreeMap<(String, String), SampleRecord>,
    derived: BTreeMap<(String, String), DerivedSampleRecord>,
    grants: BTreeMap<String, AccessGrantRecord>,
    tokens: BTreeMap<String, DownloadTokenRecord>,
    audit: Vec<AuditEntryRecord>,
}

/// In-memory [`Store`] with genuine rollback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn with_tx<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut staged = self.tables.clone();
        let value = f(&mut staged)?;
        self.tables = staged;
        Ok(value)
    }
}

impl StoreTx for Tables {
    fn insert_sample(&mut self, record: &SampleRecord) -> Result<(), StoreError> {
        let key = (record.tenant_id.clone(), record.sample_id.clone());
        if self.samples.contains_key(&key) {
            return Err(StoreError::Conflict {
                detail: format!("sample {}/{}", record.tenant_id, record.sample_id),
            });
        }
        self.samples.insert(key, record.clone());
        Ok(())
    }

    fn get_sample(
        &mut self,
        tenant_id: &str,
        sample_id: &str,
    ) -> Result<Option<SampleRecord>, StoreError> {
        Ok(self
            .samples
            .get(&(tenant_id.to_owned(), sample_id.to_owned()))
            .cloned())
    }

    fn mark_sample_deleted(
        &mut self,
        tenant_id: &str,
        sample_id: &str,
        deleted_at: u64,
    ) -> Result<(), StoreError> {
        let record = self
            .samples
            .get_mut(&(tenant_id.to_owned(), sample_id.to_owned()))
            .ok_or(StoreError::NotFound { entity: "sample" })?;
        record.status = LifecycleState::Deleted;
        record.deleted_at = Some(deleted_at);
        Ok(())
    }

    fn insert_derived(&mut self, record: &DerivedSampleRecord) -> Result<(), StoreError> {
        let key = (record.tenant_id.clone(), record.derived_id.clone());
        if self.derived.contains_key(&key) {
            return Err(StoreError::Conflict {
                detail: format!("derived sample {}/{}", record.tenant_id, record.derived_id),
            });
        }
        self.derived.insert(key, record.clone());
        Ok(())
    }

    fn get_derived(
        &mut self,
        tenant_id: &str,
        derived_id: &str,
    ) -> Result<Option<DerivedSampleRecord>, StoreError> {
        Ok(self
            .derived
            .get(&(tenant_id.to_owned(), derived_id.to_owned()))
            .cloned())
    }

    fn mark_derived_deleted(
        &mut self,
        tenant_id: &str,
        derived_id: &str,
        deleted_at: u64,
    ) -> Result<(), StoreError> {
        let record = self
            .derived
            .get_mut(&(tenant_id.to_owned(), derived_id.to_owned()))
            .ok_or(StoreError::NotFound {
                entity: "derived sample",
            })?;
        record.status = LifecycleState::Deleted;
        record.deleted_at = Some(deleted_at);
        Ok(())
    }

    fn count_active_dependents(&mut self, tenant_id: &str, id: &str) -> Result<u64, StoreError> {
        let count = self
            .derived
            .values()
            .filter(|d| {
                d.tenant_id == tenant_id
                    && d.is_active()
                    && (d.root_sample_id == id || d.parent_id.as_deref() == Some(id))
            })
            .count();
        Ok(count as u64)
    }

    fn active_descendants_of_root(
        &mut self,
        tenant_id: &str,
        root_sample_id: &str,
    ) -> Result<Vec<DerivedSampleRecord>, StoreError> {
        Ok(self
            .derived
            .values()
            .filter(|d| {
                d.tenant_id == tenant_id && d.is_active() && d.root_sample_id == root_sample_id
            })
            .cloned()
            .collect())
    }

    fn insert_grant(&mut self, record: &AccessGrantRecord) -> Result<(), StoreError> {
        if self.grants.contains_key(&record.grant_id) {
            return Err(StoreError::Conflict {
                detail: format!("grant {}", record.grant_id),
            });
        }
        self.grants.insert(record.grant_id.clone(), record.clone());
        Ok(())
    }

    fn get_grant(&mut self, grant_id: &str) -> Result<Option<AccessGrantRecord>, StoreError> {
        Ok(self.grants.get(grant_id).cloned())
    }

    fn find_active_grant(
        &mut self,
        object: &ObjectRef,
        granted_to_org_id: &str,
    ) -> Result<Option<AccessGrantRecord>, StoreError> {
        Ok(self
            .grants
            .values()
            .find(|g| {
                g.object == *object
                    && g.granted_to_org_id == granted_to_org_id
                    && g.revoked_at.is_none()
            })
            .cloned())
    }

    fn grants_for_object(
        &mut self,
        object: &ObjectRef,
    ) -> Result<Vec<AccessGrantRecord>, StoreError> {
        let mut grants: Vec<AccessGrantRecord> = self
            .grants
            .values()
            .filter(|g| g.object == *object)
            .cloned()
            .collect();
        grants.sort_by(|a, b| (a.created_at, &a.grant_id).cmp(&(b.created_at, &b.grant_id)));
        Ok(grants)
    }

    fn mark_grant_revoked(
        &mut self,
        grant_id: &str,
        revoked_at: u64,
        reason: &str,
        revoked_by: &str,
    ) -> Result<(), StoreError> {
        let record = self.grants.get_mut(grant_id).ok_or(StoreError::NotFound {
            entity: "access grant",
        })?;
        record.revoked_at = Some(revoked_at);
        record.revocation_reason = Some(reason.to_owned());
        record.revoked_by = Some(revoked_by.to_owned());
        Ok(())
    }

    fn insert_token(&mut self, record: &DownloadTokenRecord) -> Result<(), StoreError> {
        if self.tokens.contains_key(&record.token_id) {
            return Err(StoreError::Conflict {
                detail: format!("token {}", record.token_id),
            });
        }
        self.tokens.insert(record.token_id.clone(), record.clone());
        Ok(())
    }

    fn find_token_by_digest(
        &mut self,
        digest: &[u8; 32],
    ) -> Result<Option<DownloadTokenRecord>, StoreError> {
        Ok(self
            .tokens
            .values()
            .find(|t| digest_eq(&t.digest, digest))
            .cloned())
    }

    fn tokens_for_grant(
        &mut self,
        grant_id: &str,
    ) -> Result<Vec<DownloadTokenRecord>, StoreError> {
        let mut tokens: Vec<DownloadTokenRecord> = self
            .tokens
            .values()
            .filter(|t| t.grant_id.as_deref() == Some(grant_id))
            .cloned()
            .collect();
        tokens.sort_by(|a, b| (a.issued_at, &a.token_id).cmp(&(b.issued_at, &b.token_id)));
        Ok(tokens)
    }

    fn mark_token_used(&mut self, token_id: &str, used_at: u64) -> Result<(), StoreError> {
        let record = self.tokens.get_mut(token_id).ok_or(StoreError::NotFound {
            entity: "download token",
        })?;
        record.used_at = Some(used_at);
        Ok(())
    }

    fn mark_token_revoked(&mut self, token_id: &str, revoked_at: u64) -> Result<(), StoreError> {
        let record = self.tokens.get_mut(token_id).ok_or(StoreError::NotFound {
            entity: "download token",
        })?;
        record.revoked_at = Some(revoked_at);
        Ok(())
    }

    fn purge_expired_tokens(&mut self, cutoff: u64) -> Result<u64, StoreError> {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| {
            !(t.expires_at < cutoff && t.used_at.is_none() && t.revoked_at.is_none())
        });
        Ok((before - self.tokens.len()) as u64)
    }

    fn append_audit(&mut self, entry: &PendingAuditEntry) -> Result<u64, StoreError> {
        let seq_id = self.audit.len() as u64 + 1;
        self.audit.push(AuditEntryRecord {
            seq_id,
            object: entry.object.clone(),
            action: entry.action,
            actor_id: entry.actor_id.clone(),
            tenant_id: entry.tenant_id.clone(),
            detail: entry.detail.clone(),
            recorded_at: entry.recorded_at,
            request_meta: entry.request_meta.clone(),
            prev_hash: entry.prev_hash,
            entry_hash: entry.entry_hash,
        });
        Ok(seq_id)
    }

    fn audit_head_hash(&mut self) -> Result<AuditHash, StoreError> {
        Ok(self
            .audit
            .last()
            .map_or(GENESIS_PREV_HASH, |e| e.entry_hash))
    }

    fn audit_entries(&mut self) -> Result<Vec<AuditEntryRecord>, StoreError> {
        Ok(self.audit.clone())
    }

    fn audit_entries_for_object(
        &mut self,
        object: &ObjectRef,
    ) -> Result<Vec<AuditEntryRecord>, StoreError> {
        Ok(self
            .audit
            .iter()
            .filter(|e| e.object == *object)
            .cloned()
            .collect())
    }
}

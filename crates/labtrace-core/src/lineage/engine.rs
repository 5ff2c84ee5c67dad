//! Lineage mutations and traversal.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::debug;

use super::error::LineageError;
use super::record::{ActorRole, DeletionCheck, DerivedSampleRecord, LifecycleState, SampleRecord};
use super::validator::validate_derivation;
use crate::audit::{self, AuditAction, NewAuditEntry};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::object::{ObjectRef, ObjectType};
use crate::store::{Store, StoreTx};

/// Validates and applies lineage mutations.
///
/// Holds only a clock and configuration; persistence is threaded through
/// every operation as a [`Store`] handle, and each operation runs inside
/// one transaction. Two concurrent derivations from the same parent each
/// read the parent's depth inside their own transaction, so depth
/// assignment has no shared mutable state to race on.
#[derive(Debug)]
pub struct LineageEngine<C: Clock> {
    clock: C,
    config: EngineConfig,
}

impl<C: Clock> LineageEngine<C> {
    /// Creates an engine with the given clock and configuration.
    #[must_use]
    pub fn new(clock: C, config: EngineConfig) -> Self {
        Self { clock, config }
    }

    /// Registers a new root sample.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::DuplicateSample`] if the id is already in
    /// use by a sample or derived sample of this tenant.
    pub fn register_sample<S: Store>(
        &self,
        store: &mut S,
        tenant_id: &str,
        sample_id: &str,
        actor_id: &str,
    ) -> Result<SampleRecord, LineageError> {
        let now = self.clock.now_secs();
        store.with_tx(|tx| {
            if tx.get_sample(tenant_id, sample_id)?.is_some()
                || tx.get_derived(tenant_id, sample_id)?.is_some()
            {
                return Err(LineageError::DuplicateSample {
                    id: sample_id.to_owned(),
                });
            }

            let record = SampleRecord::new(sample_id, tenant_id, now);
            tx.insert_sample(&record)?;
            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    ObjectRef::sample(sample_id),
                    AuditAction::RegisterSample,
                    actor_id,
                    tenant_id,
                    json!({}),
                ),
                now,
            );
            Ok(record)
        })
    }

    /// Validates and creates a derived sample.
    ///
    /// `source_id` names the material being transformed; `parent_derived_id`
    /// names the lineage node the new sample descends from, absent when it
    /// derives directly from a root sample. Validation and insert happen in
    /// one transaction against the transactionally-read parent.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::DuplicateSample`] for an id collision,
    /// [`LineageError::ParentNotFound`] when the parent is missing or
    /// deleted, [`LineageError::NotFound`] when deriving from a missing or
    /// deleted root sample, and the validator's depth and cycle rejections.
    pub fn create_derived<S: Store>(
        &self,
        store: &mut S,
        tenant_id: &str,
        derived_id: &str,
        source_id: &str,
        parent_derived_id: Option<&str>,
        actor_id: &str,
    ) -> Result<DerivedSampleRecord, LineageError> {
        let now = self.clock.now_secs();
        let max_depth = self.config.max_derivation_depth;
        store.with_tx(|tx| {
            if tx.get_derived(tenant_id, derived_id)?.is_some()
                || tx.get_sample(tenant_id, derived_id)?.is_some()
            {
                return Err(LineageError::DuplicateSample {
                    id: derived_id.to_owned(),
                });
            }

            let parent = match parent_derived_id {
                None => None,
                Some(parent_id) => Some(
                    tx.get_derived(tenant_id, parent_id)?
                        .ok_or(LineageError::ParentNotFound)?,
                ),
            };

            let placement = validate_derivation(source_id, parent.as_ref(), max_depth)?;

            if parent.is_none() {
                // First derivation: the chain root must be a live sample.
                let root = tx.get_sample(tenant_id, source_id)?;
                if !root.as_ref().is_some_and(SampleRecord::is_active) {
                    return Err(LineageError::NotFound {
                        id: source_id.to_owned(),
                    });
                }
            }

            let record = DerivedSampleRecord {
                derived_id: derived_id.to_owned(),
                tenant_id: tenant_id.to_owned(),
                root_sample_id: placement.root_sample_id,
                parent_id: parent_derived_id.map(str::to_owned),
                depth: placement.depth,
                status: LifecycleState::Active,
                created_at: now,
                deleted_at: None,
            };
            tx.insert_derived(&record)?;
            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    ObjectRef::derived(derived_id),
                    AuditAction::CreateDerived,
                    actor_id,
                    tenant_id,
                    json!({
                        "root_sample_id": record.root_sample_id,
                        "parent_id": record.parent_id,
                        "depth": record.depth,
                    }),
                ),
                now,
            );
            Ok(record)
        })
    }

    /// Checks whether a sample or derived sample can be individually
    /// deleted.
    ///
    /// Counts active derived samples that reference the target as their
    /// chain root or immediate parent. A derived sample that roots further
    /// derivations blocks deletion exactly like an original sample. The
    /// answer for a target is unaffected by mutations of unrelated
    /// siblings.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be read.
    pub fn can_delete<S: Store>(
        &self,
        store: &mut S,
        tenant_id: &str,
        id: &str,
    ) -> Result<DeletionCheck, LineageError> {
        store.with_tx(|tx| {
            let dependent_count = tx.count_active_dependents(tenant_id, id)?;
            Ok(DeletionCheck {
                can_delete: dependent_count == 0,
                dependent_count,
            })
        })
    }

    /// Individually soft-deletes a sample or derived sample.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::NotFound`] for an unknown or already
    /// deleted target and [`LineageError::HasDependents`] when active
    /// derived samples still reference it; the caller may switch to
    /// [`Self::cascade_delete`] if authorized.
    pub fn delete_sample<S: Store>(
        &self,
        store: &mut S,
        tenant_id: &str,
        id: &str,
        actor_id: &str,
    ) -> Result<(), LineageError> {
        let now = self.clock.now_secs();
        store.with_tx(|tx| {
            let object = resolve_active_target(tx, tenant_id, id)?;

            let dependent_count = tx.count_active_dependents(tenant_id, id)?;
            if dependent_count > 0 {
                return Err(LineageError::HasDependents { dependent_count });
            }

            match object.object_type {
                ObjectType::Sample => tx.mark_sample_deleted(tenant_id, id, now)?,
                ObjectType::DerivedSample => tx.mark_derived_deleted(tenant_id, id, now)?,
            }
            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    object,
                    AuditAction::DeleteSample,
                    actor_id,
                    tenant_id,
                    json!({}),
                ),
                now,
            );
            Ok(())
        })
    }

    /// Soft-deletes a root sample together with every active descendant.
    ///
    /// Descendants and root are tombstoned in one transaction, so a
    /// concurrent reader observes either the whole chain live or the
    /// whole chain deleted. Returns the number of records deleted, root
    /// included.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Unauthorized`] unless the actor is an
    /// admin, and [`LineageError::NotFound`] for an unknown or already
    /// deleted root, so a repeated cascade surfaces as an error rather
    /// than a silent no-op.
    pub fn cascade_delete<S: Store>(
        &self,
        store: &mut S,
        tenant_id: &str,
        root_id: &str,
        actor_id: &str,
        actor_role: ActorRole,
    ) -> Result<u64, LineageError> {
        if actor_role != ActorRole::Admin {
            return Err(LineageError::Unauthorized {
                required: ActorRole::Admin,
            });
        }

        let now = self.clock.now_secs();
        store.with_tx(|tx| {
            let root = tx
                .get_sample(tenant_id, root_id)?
                .ok_or_else(|| LineageError::NotFound {
                    id: root_id.to_owned(),
                })?;
            if !root.is_active() {
                return Err(LineageError::NotFound {
                    id: root_id.to_owned(),
                });
            }

            let descendants = tx.active_descendants_of_root(tenant_id, root_id)?;
            for descendant in &descendants {
                tx.mark_derived_deleted(tenant_id, &descendant.derived_id, now)?;
            }
            tx.mark_sample_deleted(tenant_id, root_id, now)?;

            let deleted_count = descendants.len() as u64 + 1;
            debug!(tenant_id, root_id, deleted_count, "cascade delete applied");
            audit::record_best_effort(
                tx,
                NewAuditEntry::new(
                    ObjectRef::sample(root_id),
                    AuditAction::CascadeDelete,
                    actor_id,
                    tenant_id,
                    json!({ "deleted_count": deleted_count }),
                ),
                now,
            );
            Ok(deleted_count)
        })
    }

    /// Lists the active descendants of a root sample in traversal order:
    /// ascending depth, ties broken by id.
    ///
    /// The walk is an explicit level-ordered worklist over an arena of
    /// nodes grouped by parent. It is finite, read-only, and restartable;
    /// nodes unreachable from the root are never emitted.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::NotFound`] if no such root sample exists.
    pub fn lineage_chain<S: Store>(
        &self,
        store: &mut S,
        tenant_id: &str,
        root_id: &str,
    ) -> Result<Vec<String>, LineageError> {
        store.with_tx(|tx| {
            if tx.get_sample(tenant_id, root_id)?.is_none() {
                return Err(LineageError::NotFound {
                    id: root_id.to_owned(),
                });
            }

            let descendants = tx.active_descendants_of_root(tenant_id, root_id)?;

            let mut by_parent: BTreeMap<Option<String>, Vec<DerivedSampleRecord>> = BTreeMap::new();
            for node in descendants {
                by_parent.entry(node.parent_id.clone()).or_default().push(node);
            }

            let mut ordered = Vec::new();
            let mut frontier = by_parent.remove(&None).unwrap_or_default();
            while !frontier.is_empty() {
                frontier.sort_by(|a, b| a.derived_id.cmp(&b.derived_id));
                let mut next = Vec::new();
                for node in frontier {
                    if let Some(children) = by_parent.remove(&Some(node.derived_id.clone())) {
                        next.extend(children);
                    }
                    ordered.push(node.derived_id);
                }
                frontier = next;
            }

            Ok(ordered)
        })
    }
}

/// Resolves a deletion target to its typed object reference, requiring it
/// to exist and be active.
fn resolve_active_target(
    tx: &mut dyn StoreTx,
    tenant_id: &str,
    id: &str,
) -> Result<ObjectRef, LineageError> {
    if let Some(sample) = tx.get_sample(tenant_id, id)? {
        if sample.is_active() {
            return Ok(ObjectRef::sample(id));
        }
        return Err(LineageError::NotFound { id: id.to_owned() });
    }
    if let Some(derived) = tx.get_derived(tenant_id, id)? {
        if derived.is_active() {
            return Ok(ObjectRef::derived(id));
        }
    }
    Err(LineageError::NotFound { id: id.to_owned() })
}

use super::{
    validate_derivation, ActorRole, DerivedSampleRecord, LifecycleState, LineageEngine,
    LineageError,
};
use crate::audit::{self, AuditAction};
use crate::clock::FixedClock;
use crate::config::EngineConfig;
use crate::store::{MemoryStore, Store, StoreError};

const T0: u64 = 1_700_000_000;
const TENANT: &str = "lab-a";

fn engine() -> LineageEngine<FixedClock> {
    LineageEngine::new(FixedClock::new(T0), EngineConfig::default())
}

/// `s1 -> d1 (depth 0) -> d2 (depth 1) -> d3 (depth 2)`.
fn seeded_chain(store: &mut MemoryStore) -> LineageEngine<FixedClock> {
    let engine = engine();
    engine
        .register_sample(store, TENANT, "s1", "alice")
        .unwrap();
    engine
        .create_derived(store, TENANT, "d1", "s1", None, "alice")
        .unwrap();
    engine
        .create_derived(store, TENANT, "d2", "d1", Some("d1"), "alice")
        .unwrap();
    engine
        .create_derived(store, TENANT, "d3", "d2", Some("d2"), "alice")
        .unwrap();
    engine
}

fn fetch_derived(store: &mut MemoryStore, id: &str) -> Option<DerivedSampleRecord> {
    store
        .with_tx(|tx| Ok::<_, StoreError>(tx.get_derived(TENANT, id)?))
        .unwrap()
}

fn parent_at(depth: u8) -> DerivedSampleRecord {
    DerivedSampleRecord {
        derived_id: "parent".to_owned(),
        tenant_id: TENANT.to_owned(),
        root_sample_id: "s1".to_owned(),
        parent_id: None,
        depth,
        status: LifecycleState::Active,
        created_at: T0,
        deleted_at: None,
    }
}

// --- validator ---

#[test]
fn no_parent_places_at_depth_zero() {
    let placement = validate_derivation("s1", None, 2).unwrap();
    assert_eq!(placement.root_sample_id, "s1");
    assert_eq!(placement.depth, 0);
}

#[test]
fn child_placement_inherits_root_and_increments_depth() {
    let placement = validate_derivation("parent", Some(&parent_at(1)), 2).unwrap();
    assert_eq!(placement.root_sample_id, "s1");
    assert_eq!(placement.depth, 2);
}

#[test]
fn deleted_parent_is_rejected_before_depth() {
    let mut parent = parent_at(2);
    parent.status = LifecycleState::Deleted;
    parent.deleted_at = Some(T0);
    let err = validate_derivation("parent", Some(&parent), 2).unwrap_err();
    assert!(matches!(err, LineageError::ParentNotFound));
}

#[test]
fn depth_is_checked_before_circularity() {
    // Both violations at once: the depth cap wins.
    let err = validate_derivation("s1", Some(&parent_at(2)), 2).unwrap_err();
    assert!(matches!(
        err,
        LineageError::DepthExceeded { depth: 3, max: 2 }
    ));
}

#[test]
fn reusing_chain_root_material_is_circular() {
    let err = validate_derivation("s1", Some(&parent_at(0)), 2).unwrap_err();
    assert!(matches!(
        err,
        LineageError::CircularReference { source_id } if source_id == "s1"
    ));
}

// --- registration and derivation ---

#[test]
fn register_sample_starts_active() {
    let mut store = MemoryStore::new();
    let record = engine()
        .register_sample(&mut store, TENANT, "s1", "alice")
        .unwrap();
    assert_eq!(record.sample_id, "s1");
    assert_eq!(record.status, LifecycleState::Active);
    assert_eq!(record.created_at, T0);
    assert!(record.deleted_at.is_none());
}

#[test]
fn sample_ids_are_unique_across_samples_and_derivations() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let err = engine
        .register_sample(&mut store, TENANT, "s1", "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::DuplicateSample { id } if id == "s1"));

    // A derived id cannot be reused as a sample id, nor the reverse.
    let err = engine
        .register_sample(&mut store, TENANT, "d1", "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::DuplicateSample { id } if id == "d1"));
    let err = engine
        .create_derived(&mut store, TENANT, "s1", "d1", Some("d1"), "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::DuplicateSample { id } if id == "s1"));
}

#[test]
fn chain_depths_increment_and_cap_at_two() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let d1 = fetch_derived(&mut store, "d1").unwrap();
    assert_eq!((d1.depth, d1.parent_id), (0, None));
    assert_eq!(d1.root_sample_id, "s1");
    let d2 = fetch_derived(&mut store, "d2").unwrap();
    assert_eq!((d2.depth, d2.parent_id.as_deref()), (1, Some("d1")));
    assert_eq!(d2.root_sample_id, "s1");
    let d3 = fetch_derived(&mut store, "d3").unwrap();
    assert_eq!((d3.depth, d3.parent_id.as_deref()), (2, Some("d2")));

    let err = engine
        .create_derived(&mut store, TENANT, "d4", "d3", Some("d3"), "alice")
        .unwrap_err();
    assert!(matches!(
        err,
        LineageError::DepthExceeded { depth: 3, max: 2 }
    ));
    assert!(fetch_derived(&mut store, "d4").is_none());
}

#[test]
fn derivation_from_missing_or_deleted_parent_is_rejected() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let err = engine
        .create_derived(&mut store, TENANT, "dx", "ghost", Some("ghost"), "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::ParentNotFound));

    engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap();
    let err = engine
        .create_derived(&mut store, TENANT, "dx", "d3", Some("d3"), "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::ParentNotFound));
}

#[test]
fn first_derivation_requires_live_root_sample() {
    let mut store = MemoryStore::new();
    let engine = engine();

    let err = engine
        .create_derived(&mut store, TENANT, "d1", "ghost", None, "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "ghost"));

    engine
        .register_sample(&mut store, TENANT, "s2", "alice")
        .unwrap();
    engine
        .delete_sample(&mut store, TENANT, "s2", "alice")
        .unwrap();
    let err = engine
        .create_derived(&mut store, TENANT, "d1", "s2", None, "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "s2"));
}

#[test]
fn derivations_are_tenant_scoped() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    // Another tenant sees none of lab-a's lineage.
    let err = engine
        .create_derived(&mut store, "lab-b", "d9", "d1", Some("d1"), "bob")
        .unwrap_err();
    assert!(matches!(err, LineageError::ParentNotFound));
    let err = engine
        .create_derived(&mut store, "lab-b", "d9", "s1", None, "bob")
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "s1"));
}

// --- deletion ---

#[test]
fn can_delete_counts_active_dependents() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    // Every node of the chain points at s1 as its root.
    let check = engine.can_delete(&mut store, TENANT, "s1").unwrap();
    assert!(!check.can_delete);
    assert_eq!(check.dependent_count, 3);

    let check = engine.can_delete(&mut store, TENANT, "d2").unwrap();
    assert!(!check.can_delete);
    assert_eq!(check.dependent_count, 1);

    let check = engine.can_delete(&mut store, TENANT, "d3").unwrap();
    assert!(check.can_delete);
    assert_eq!(check.dependent_count, 0);

    engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap();
    let check = engine.can_delete(&mut store, TENANT, "d2").unwrap();
    assert!(check.can_delete);
}

#[test]
fn individual_delete_rejects_dependents() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let err = engine
        .delete_sample(&mut store, TENANT, "s1", "alice")
        .unwrap_err();
    assert!(matches!(
        err,
        LineageError::HasDependents { dependent_count: 3 }
    ));
    let err = engine
        .delete_sample(&mut store, TENANT, "d1", "alice")
        .unwrap_err();
    assert!(matches!(
        err,
        LineageError::HasDependents { dependent_count: 1 }
    ));
}

#[test]
fn delete_is_a_tombstone_not_an_erase() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap();
    let d3 = fetch_derived(&mut store, "d3").unwrap();
    assert_eq!(d3.status, LifecycleState::Deleted);
    assert_eq!(d3.deleted_at, Some(T0));

    // Deleted is terminal; a second delete sees no live target.
    let err = engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "d3"));
    let err = engine
        .delete_sample(&mut store, TENANT, "ghost", "alice")
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "ghost"));
}

#[test]
fn cascade_delete_requires_admin() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let err = engine
        .cascade_delete(&mut store, TENANT, "s1", "mallory", ActorRole::Member)
        .unwrap_err();
    assert!(matches!(
        err,
        LineageError::Unauthorized {
            required: ActorRole::Admin
        }
    ));
    assert!(fetch_derived(&mut store, "d1").unwrap().is_active());
}

#[test]
fn cascade_delete_tombstones_whole_chain() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let deleted = engine
        .cascade_delete(&mut store, TENANT, "s1", "alice", ActorRole::Admin)
        .unwrap();
    assert_eq!(deleted, 4);

    for id in ["d1", "d2", "d3"] {
        let record = fetch_derived(&mut store, id).unwrap();
        assert_eq!(record.status, LifecycleState::Deleted);
        assert_eq!(record.deleted_at, Some(T0));
    }
    let root = store
        .with_tx(|tx| Ok::<_, StoreError>(tx.get_sample(TENANT, "s1")?))
        .unwrap()
        .unwrap();
    assert_eq!(root.status, LifecycleState::Deleted);

    // The chain is already gone, so a repeat has no live root to act on.
    let err = engine
        .cascade_delete(&mut store, TENANT, "s1", "alice", ActorRole::Admin)
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "s1"));
}

#[test]
fn cascade_delete_targets_root_samples_only() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    let err = engine
        .cascade_delete(&mut store, TENANT, "d1", "alice", ActorRole::Admin)
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "d1"));
}

#[test]
fn cascade_delete_skips_already_deleted_descendants() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap();
    let deleted = engine
        .cascade_delete(&mut store, TENANT, "s1", "alice", ActorRole::Admin)
        .unwrap();
    assert_eq!(deleted, 3);
}

// --- traversal ---

#[test]
fn lineage_chain_orders_by_depth_then_id() {
    let mut store = MemoryStore::new();
    let engine = engine();
    engine
        .register_sample(&mut store, TENANT, "s1", "alice")
        .unwrap();
    engine
        .create_derived(&mut store, TENANT, "b-alq", "s1", None, "alice")
        .unwrap();
    engine
        .create_derived(&mut store, TENANT, "a-alq", "s1", None, "alice")
        .unwrap();
    // Ids sort against the grain of their parents: "c-ext" hangs off the
    // later parent, "z-ext" off the earlier one.
    engine
        .create_derived(&mut store, TENANT, "z-ext", "a-alq", Some("a-alq"), "alice")
        .unwrap();
    engine
        .create_derived(&mut store, TENANT, "c-ext", "b-alq", Some("b-alq"), "alice")
        .unwrap();

    let chain = engine.lineage_chain(&mut store, TENANT, "s1").unwrap();
    assert_eq!(chain, vec!["a-alq", "b-alq", "c-ext", "z-ext"]);
}

#[test]
fn lineage_chain_excludes_deleted_nodes() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap();
    let chain = engine.lineage_chain(&mut store, TENANT, "s1").unwrap();
    assert_eq!(chain, vec!["d1", "d2"]);
}

#[test]
fn lineage_chain_of_unknown_root_is_not_found() {
    let mut store = MemoryStore::new();
    seeded_chain(&mut store);

    let err = engine()
        .lineage_chain(&mut store, TENANT, "ghost")
        .unwrap_err();
    assert!(matches!(err, LineageError::NotFound { id } if id == "ghost"));
}

#[test]
fn lineage_chain_of_cascaded_root_is_empty() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);

    engine
        .cascade_delete(&mut store, TENANT, "s1", "alice", ActorRole::Admin)
        .unwrap();
    let chain = engine.lineage_chain(&mut store, TENANT, "s1").unwrap();
    assert!(chain.is_empty());
}

// --- audit trail ---

#[test]
fn lineage_mutations_append_verifiable_audit_entries() {
    let mut store = MemoryStore::new();
    let engine = seeded_chain(&mut store);
    engine
        .delete_sample(&mut store, TENANT, "d3", "alice")
        .unwrap();
    engine
        .cascade_delete(&mut store, TENANT, "s1", "alice", ActorRole::Admin)
        .unwrap();

    let entries = store
        .with_tx(|tx| Ok::<_, StoreError>(tx.audit_entries()?))
        .unwrap();
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::RegisterSample,
            AuditAction::CreateDerived,
            AuditAction::CreateDerived,
            AuditAction::CreateDerived,
            AuditAction::DeleteSample,
            AuditAction::CascadeDelete,
        ]
    );
    assert!(audit::verify_chain(&entries));

    let cascade = entries.last().unwrap();
    assert_eq!(cascade.detail["deleted_count"], 3);
    assert_eq!(cascade.actor_id, "alice");
}

use super::{CreateGrantRequest, GrantError, GrantRole, RevocationCoordinator, RevokeGrantRequest};
use crate::audit::{self, AuditAction};
use crate::clock::FixedClock;
use crate::object::ObjectRef;
use crate::store::{MemoryStore, Store, StoreError};
use crate::token::{digest_secret, DownloadTokenRecord};

const T0: u64 = 1_700_000_000;
const TENANT: &str = "lab-a";

fn coordinator() -> RevocationCoordinator<FixedClock> {
    RevocationCoordinator::new(FixedClock::new(T0))
}

fn create_request() -> CreateGrantRequest {
    CreateGrantRequest::new(
        ObjectRef::sample("s1"),
        TENANT,
        "org-b",
        GrantRole::Viewer,
        "alice",
    )
}

fn revoke_request() -> RevokeGrantRequest {
    RevokeGrantRequest::new(ObjectRef::sample("s1"), "org-b", "org-a", "contract ended")
}

fn seed_token(store: &mut MemoryStore, token_id: &str, grant_id: Option<&str>) {
    let record = DownloadTokenRecord {
        token_id: token_id.to_owned(),
        digest: digest_secret(token_id),
        object: ObjectRef::sample("s1"),
        tenant_id: TENANT.to_owned(),
        issued_to_user_id: "bob".to_owned(),
        grant_id: grant_id.map(str::to_owned),
        issued_at: T0,
        expires_at: T0 + 900,
        one_time_use: false,
        used_at: None,
        revoked_at: None,
    };
    store
        .with_tx(|tx| Ok::<_, StoreError>(tx.insert_token(&record)?))
        .unwrap();
}

fn tokens_under(store: &mut MemoryStore, grant_id: &str) -> Vec<DownloadTokenRecord> {
    store
        .with_tx(|tx| Ok::<_, StoreError>(tx.tokens_for_grant(grant_id)?))
        .unwrap()
}

#[test]
fn created_grant_is_discoverable_while_unrevoked() {
    let mut store = MemoryStore::new();
    let grant = coordinator()
        .create_grant(&mut store, create_request().with_expiry(T0 + 3600))
        .unwrap();

    assert_eq!(grant.owner_tenant_id, TENANT);
    assert_eq!(grant.granted_role, GrantRole::Viewer);
    assert_eq!(grant.expires_at, Some(T0 + 3600));
    assert!(!grant.is_revoked());

    let found = store
        .with_tx(|tx| {
            Ok::<_, StoreError>(tx.find_active_grant(&ObjectRef::sample("s1"), "org-b")?)
        })
        .unwrap()
        .unwrap();
    assert_eq!(found.grant_id, grant.grant_id);
}

#[test]
fn one_live_grant_per_object_and_grantee() {
    let mut store = MemoryStore::new();
    let coordinator = coordinator();
    coordinator
        .create_grant(&mut store, create_request().with_expiry(T0 + 10))
        .unwrap();

    // Still blocked while un-revoked, even well past the grant's expiry.
    let err = RevocationCoordinator::new(FixedClock::new(T0 + 500))
        .create_grant(&mut store, create_request())
        .unwrap_err();
    assert!(matches!(
        err,
        GrantError::AlreadyGranted { object_id } if object_id == "s1"
    ));

    // A different grantee or object is unaffected.
    coordinator
        .create_grant(
            &mut store,
            CreateGrantRequest::new(
                ObjectRef::sample("s1"),
                TENANT,
                "org-c",
                GrantRole::Analyst,
                "alice",
            ),
        )
        .unwrap();

    // Revoking clears the way for a replacement.
    coordinator
        .revoke_grant(&mut store, revoke_request())
        .unwrap();
    coordinator
        .create_grant(&mut store, create_request())
        .unwrap();
}

#[test]
fn revoking_without_a_live_grant_is_grant_not_found() {
    let mut store = MemoryStore::new();
    let coordinator = coordinator();

    let err = coordinator
        .revoke_grant(&mut store, revoke_request())
        .unwrap_err();
    assert!(matches!(err, GrantError::GrantNotFound));

    coordinator
        .create_grant(&mut store, create_request())
        .unwrap();
    coordinator
        .revoke_grant(&mut store, revoke_request())
        .unwrap();

    // Double revocation surfaces as its own failure, not a silent no-op.
    let err = coordinator
        .revoke_grant(&mut store, revoke_request())
        .unwrap_err();
    assert!(matches!(err, GrantError::GrantNotFound));
}

#[test]
fn revocation_stamps_grant_and_dependent_tokens() {
    let mut store = MemoryStore::new();
    let coordinator = coordinator();
    let grant = coordinator
        .create_grant(&mut store, create_request())
        .unwrap();
    seed_token(&mut store, "under-1", Some(&grant.grant_id));
    seed_token(&mut store, "under-2", Some(&grant.grant_id));
    seed_token(&mut store, "standalone", None);

    let later = RevocationCoordinator::new(FixedClock::new(T0 + 500));
    let revoked = later.revoke_grant(&mut store, revoke_request()).unwrap();
    assert_eq!(revoked, 2);

    let stamped = store
        .with_tx(|tx| Ok::<_, StoreError>(tx.get_grant(&grant.grant_id)?))
        .unwrap()
        .unwrap();
    assert_eq!(stamped.revoked_at, Some(T0 + 500));
    assert_eq!(stamped.revocation_reason.as_deref(), Some("contract ended"));
    assert_eq!(stamped.revoked_by.as_deref(), Some("org-a"));

    for token in tokens_under(&mut store, &grant.grant_id) {
        assert_eq!(token.revoked_at, Some(T0 + 500));
    }
    let standalone = store
        .with_tx(|tx| Ok::<_, StoreError>(tx.find_token_by_digest(&digest_secret("standalone"))?))
        .unwrap()
        .unwrap();
    assert!(standalone.revoked_at.is_none());
}

#[test]
fn revocation_leaves_previously_revoked_tokens_untouched() {
    let mut store = MemoryStore::new();
    let coordinator = coordinator();
    let grant = coordinator
        .create_grant(&mut store, create_request())
        .unwrap();
    seed_token(&mut store, "early", Some(&grant.grant_id));
    seed_token(&mut store, "late", Some(&grant.grant_id));
    store
        .with_tx(|tx| Ok::<_, StoreError>(tx.mark_token_revoked("early", T0 + 1)?))
        .unwrap();

    let later = RevocationCoordinator::new(FixedClock::new(T0 + 500));
    let revoked = later.revoke_grant(&mut store, revoke_request()).unwrap();
    assert_eq!(revoked, 1);

    let tokens = tokens_under(&mut store, &grant.grant_id);
    let early = tokens.iter().find(|t| t.token_id == "early").unwrap();
    assert_eq!(early.revoked_at, Some(T0 + 1));
}

#[test]
fn revocation_appends_exactly_one_transactional_entry() {
    let mut store = MemoryStore::new();
    let coordinator = coordinator();
    let grant = coordinator
        .create_grant(&mut store, create_request().with_expiry(T0 + 3600))
        .unwrap();
    seed_token(&mut store, "under-1", Some(&grant.grant_id));
    seed_token(&mut store, "under-2", Some(&grant.grant_id));

    coordinator
        .revoke_grant(&mut store, revoke_request())
        .unwrap();

    let entries = store
        .with_tx(|tx| Ok::<_, StoreError>(tx.audit_entries()?))
        .unwrap();
    let revocations: Vec<_> = entries
        .iter()
        .filter(|e| e.action == AuditAction::RevokeAccess)
        .collect();
    assert_eq!(revocations.len(), 1);

    let entry = revocations[0];
    assert_eq!(entry.actor_id, "org-a");
    assert_eq!(entry.tenant_id, TENANT);
    assert_eq!(entry.detail["grant_id"], grant.grant_id.as_str());
    assert_eq!(entry.detail["prior_role"], "viewer");
    assert_eq!(entry.detail["original_expires_at"], T0 + 3600);
    assert_eq!(entry.detail["reason"], "contract ended");
    assert_eq!(entry.detail["revoked_token_count"], 2);
    assert!(audit::verify_chain(&entries));
}

#[test]
fn grants_for_object_lists_full_history() {
    let mut store = MemoryStore::new();
    let coordinator = coordinator();
    coordinator
        .create_grant(&mut store, create_request())
        .unwrap();
    coordinator
        .revoke_grant(&mut store, revoke_request())
        .unwrap();
    let replacement = RevocationCoordinator::new(FixedClock::new(T0 + 100))
        .create_grant(&mut store, create_request())
        .unwrap();

    let history = coordinator
        .grants_for_object(&mut store, &ObjectRef::sample("s1"))
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].is_revoked());
    assert_eq!(history[1].grant_id, replacement.grant_id);
}

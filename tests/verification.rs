//! Identity verification tokens and the LMDB role store

use std::thread;
use std::time::Duration;

use privmap::*;

fn setup() -> (tempfile::TempDir, Lmdb) {
    let dir = tempfile::tempdir().unwrap();
    let db = Lmdb::open(dir.path()).unwrap();
    (dir, db)
}

// ============================================================================
// Passwords
// ============================================================================

#[test]
fn test_password_verification() {
    let (_dir, db) = setup();
    let v = Verifier::new(db);
    v.set_password("admin", "shopware").unwrap();
    assert!(v.verify_password("admin", "shopware").unwrap());
    assert!(!v.verify_password("admin", "wrong").unwrap());
    assert!(!v.verify_password("nobody", "shopware").unwrap());
}

#[test]
fn test_password_change_invalidates_old() {
    let (_dir, db) = setup();
    let v = Verifier::new(db);
    v.set_password("admin", "old").unwrap();
    v.set_password("admin", "new").unwrap();
    assert!(!v.verify_password("admin", "old").unwrap());
    assert!(v.verify_password("admin", "new").unwrap());
}

// ============================================================================
// Tokens
// ============================================================================

#[test]
fn test_issue_and_validate() {
    let (_dir, db) = setup();
    let v = Verifier::new(db);
    v.set_password("admin", "shopware").unwrap();
    let ctx = v.issue("admin", "shopware").unwrap();
    assert_eq!(v.validate(&ctx).unwrap(), "admin");
}

#[test]
fn test_issue_with_wrong_password_fails() {
    let (_dir, db) = setup();
    let v = Verifier::new(db);
    v.set_password("admin", "shopware").unwrap();
    assert!(matches!(v.issue("admin", "nope"), Err(PrivmapError::InvalidCredentials)));
}

#[test]
fn test_unknown_token_is_invalid() {
    let (_dir, db) = setup();
    let v = Verifier::new(db);
    assert!(matches!(v.validate(&SaveContext::new("1a2b3c")), Err(PrivmapError::InvalidToken)));
}

#[test]
fn test_token_expires() {
    let (_dir, db) = setup();
    let v = Verifier::with_ttl(db, 0);
    v.set_password("admin", "shopware").unwrap();
    let ctx = v.issue("admin", "shopware").unwrap();
    thread::sleep(Duration::from_millis(5));
    assert!(matches!(v.validate(&ctx), Err(PrivmapError::TokenExpired)));
    assert_eq!(v.purge_expired().unwrap(), 1);
    assert!(matches!(v.validate(&ctx), Err(PrivmapError::InvalidToken)));
}

#[test]
fn test_revoke_token() {
    let (_dir, db) = setup();
    let v = Verifier::new(db);
    v.set_password("admin", "shopware").unwrap();
    let ctx = v.issue("admin", "shopware").unwrap();
    assert!(v.revoke(&ctx).unwrap());
    assert!(!v.revoke(&ctx).unwrap());
    assert!(v.validate(&ctx).is_err());
}

#[test]
fn test_token_is_not_stored_in_clear() {
    let (_dir, db) = setup();
    let v = Verifier::new(db.clone());
    v.set_password("admin", "shopware").unwrap();
    let ctx = v.issue("admin", "shopware").unwrap();
    let stored = db
        .read(|d, tx| {
            let mut keys = Vec::new();
            for item in d.verifications.iter(tx)? {
                keys.push(item?.0.to_string());
            }
            Ok(keys)
        })
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0], ctx.access);
}

// ============================================================================
// Editor against LMDB
// ============================================================================

#[test]
fn test_editor_round_trip_through_lmdb() {
    let (_dir, db) = setup();
    let store = LmdbRoleStore::new(db.clone());
    let verifier = Verifier::new(db);
    verifier.set_password("admin", "shopware").unwrap();

    let mut b = MappingTableBuilder::new();
    b.add_entry(
        PrivilegeMappingEntry::new(Category::AdditionalPermissions, "system")
            .with_role("clear_cache", RoleDefinition::new(["system:clear:cache"], Vec::<String>::new())),
    )
    .unwrap();
    let resolver = PrivilegeResolver::new(std::sync::Arc::new(b.build().unwrap()));

    let ctx = verifier.issue("admin", "shopware").unwrap();
    store.save(&Role::new("r1", "Support"), &ctx).unwrap();

    let mut ed = RoleEditor::load(&store, resolver.clone(), "r1").unwrap();
    ed.toggle("system.clear_cache");
    ed.request_save();
    ed.save(&store, &verifier, &ctx).unwrap();

    assert_eq!(store.revision("r1").unwrap(), 2);
    let reloaded = RoleEditor::load(&store, resolver, "r1").unwrap();
    assert_eq!(reloaded.selected(), &["system.clear_cache"]);
    assert!(!reloaded.is_dirty());
}

//! Update validation and renames

use crate::common::{Fixture, User};
use strata_entities::{ErrorCode, PutMode};

fn update(f: &Fixture, user: User) -> strata_entities::StrataResult<()> {
    f.db.update(|txn| f.users.put(txn, &user, PutMode::Update))
}

#[test]
fn rename_moves_the_pointer() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    update(&f, User::new("1", "alicia")).unwrap();

    assert_eq!(f.find(&User::by_name("alice")).unwrap_err().code(), ErrorCode::NotFound);
    assert_eq!(f.find(&User::by_name("alicia")).unwrap(), User::new("1", "alicia"));
    assert_eq!(f.pointer_keys(), vec!["alicia"]);
}

#[test]
fn update_never_creates() {
    let f = Fixture::new();
    let err = update(&f, User::new("1", "alice")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(f.user_ids().is_empty());
    assert!(f.pointer_keys().is_empty());
}

#[test]
fn rename_onto_a_live_name_conflicts() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();

    let err = update(&f, User::new("2", "alice")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert!(err
        .to_string()
        .contains("user entity update conflicts with an existing entity for key alice"));
    assert_eq!(f.find(&User::by_id("2")).unwrap().name, "bob");
}

#[test]
fn rename_onto_a_dangling_pointer_reports_the_missing_record() {
    let f = Fixture::new();
    f.create("1", "bob").unwrap();
    f.db.update(|txn| f.users.index_store().put(txn, &User::new("9", "alice")))
        .unwrap();

    let err = update(&f, User::new("1", "alice")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(err.to_string().contains("user does not exist for key 9"));
}

#[test]
fn payload_update_keeps_the_pointer() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    let mut changed = User::new("1", "alice");
    changed.email = "alice@example.org".to_string();
    update(&f, changed.clone()).unwrap();

    assert_eq!(f.find(&User::by_name("alice")).unwrap(), changed);
    assert_eq!(f.pointer_keys(), vec!["alice"]);
}

#[test]
fn swapping_names_in_one_transaction() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();

    f.db.update(|txn| {
        f.users.put(txn, &User::new("1", "tmp"), PutMode::Update)?;
        f.users.put(txn, &User::new("2", "alice"), PutMode::Update)?;
        f.users.put(txn, &User::new("1", "bob"), PutMode::Update)
    })
    .unwrap();

    assert_eq!(f.find(&User::by_name("alice")).unwrap().id, "2");
    assert_eq!(f.find(&User::by_name("bob")).unwrap().id, "1");
    assert_eq!(f.pointer_keys(), vec!["alice", "bob"]);
}

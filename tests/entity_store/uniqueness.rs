//! Unique-key enforcement on create

use crate::common::{Fixture, User};
use strata_entities::{ErrorCode, PutMode};

#[test]
fn second_claim_on_a_unique_key_conflicts() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    let err = f.create("2", "alice").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert!(err.to_string().contains("user is not unique for key alice"));

    // E1 remains, E2 was never written
    assert_eq!(f.find(&User::by_name("alice")).unwrap().id, "1");
    assert_eq!(f.find(&User::by_id("2")).unwrap_err().code(), ErrorCode::NotFound);
    assert_eq!(f.user_ids(), vec!["1"]);
}

#[test]
fn conflict_rolls_back_earlier_writes_in_the_transaction() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    let err = f
        .db
        .update(|txn| {
            f.users.put(txn, &User::new("2", "bob"), PutMode::New)?;
            f.users.put(txn, &User::new("3", "alice"), PutMode::New)
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(f.user_ids(), vec!["1"]);
    assert_eq!(f.pointer_keys(), vec!["alice"]);
}

#[test]
fn dangling_pointer_does_not_block_a_create() {
    let f = Fixture::new();
    // Pointer alice -> 9 with no record at 9
    f.db.update(|txn| f.users.index_store().put(txn, &User::new("9", "alice")))
        .unwrap();

    f.create("1", "alice").unwrap();
    assert_eq!(f.find(&User::by_name("alice")).unwrap().id, "1");
}

#[test]
fn create_with_an_existing_primary_key_is_allowed() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("1", "alicia").unwrap();

    assert_eq!(f.find(&User::by_id("1")).unwrap().name, "alicia");
    assert_eq!(f.find(&User::by_name("alicia")).unwrap().id, "1");
    // The pointer for the previous name is stale and resolves to nothing
    assert_eq!(f.find(&User::by_name("alice")).unwrap_err().code(), ErrorCode::NotFound);
}

#[test]
fn create_without_a_unique_key_is_invalid() {
    let f = Fixture::new();
    let err = f
        .db
        .update(|txn| f.users.put(txn, &User::by_id("1"), PutMode::New))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Invalid);
}

#[test]
fn read_only_transactions_cannot_create() {
    let f = Fixture::new();
    let err = f
        .db
        .view(|txn| f.users.put(txn, &User::new("1", "alice"), PutMode::New))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(f.user_ids().is_empty());
}

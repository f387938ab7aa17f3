//! Cascading deletes through the index and through caller relations

use crate::common::{Fixture, Membership, User};
use strata_entities::{DeleteOptions, ErrorCode, StrataError};

#[test]
fn delete_ent_removes_record_and_pointer() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    f.db.update(|txn| f.users.delete_ent(txn, &User::by_id("1"))).unwrap();

    assert_eq!(f.find(&User::by_id("1")).unwrap_err().code(), ErrorCode::NotFound);
    assert_eq!(f.find(&User::by_name("alice")).unwrap_err().code(), ErrorCode::NotFound);
    assert!(f.pointer_keys().is_empty());
}

#[test]
fn delete_ent_by_unique_key() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();

    f.db.update(|txn| f.users.delete_ent(txn, &User::by_name("bob"))).unwrap();
    assert_eq!(f.user_ids(), vec!["1"]);
    assert_eq!(f.pointer_keys(), vec!["alice"]);
}

#[test]
fn delete_ent_of_missing_record_is_not_found() {
    let f = Fixture::new();
    let err = f
        .db
        .update(|txn| f.users.delete_ent(txn, &User::by_name("ghost")))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[test]
fn batch_delete_leaves_no_orphaned_pointers() {
    let f = Fixture::new();
    for i in 0..20 {
        f.create(&format!("{:02}", i), &format!("user{:02}", i)).unwrap();
    }

    let removed = f
        .db
        .update(|txn| {
            f.users.delete(
                txn,
                DeleteOptions::new().filter(|_, u: &User| u.id.ends_with('0') || u.id.ends_with('5')),
            )
        })
        .unwrap();
    assert_eq!(removed, 4);

    let pointers = f.pointer_keys();
    assert_eq!(pointers.len(), 16);
    for gone in ["user00", "user05", "user10", "user15"] {
        assert!(!pointers.contains(&gone.to_string()));
    }
    let report = f.db.view(|txn| f.users.verify_index(txn)).unwrap();
    assert!(report.is_consistent());
}

#[test]
fn delete_relations_cascade_into_other_stores() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();
    f.db.update(|txn| {
        for (user, org) in [("1", "acme"), ("1", "initech"), ("2", "acme")] {
            f.memberships.put(txn, &Membership::new(user, org))?;
        }
        Ok(())
    })
    .unwrap();

    let removed = f
        .db
        .update(|txn| {
            let options = f.with_membership_cascade(
                DeleteOptions::new().filter(|_, u: &User| u.name == "alice"),
            );
            f.users.delete(txn, options)
        })
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(f.membership_count(), 1);
    assert_eq!(f.pointer_keys(), vec!["bob"]);
}

#[test]
fn failing_relation_aborts_the_whole_delete() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();

    let err = f
        .db
        .update(|txn| {
            let options = DeleteOptions::<User>::new().relation(|_, _, user| {
                if user.name == "bob" {
                    Err(StrataError::conflict("bob still owns resources"))
                } else {
                    Ok(())
                }
            });
            f.users.delete(txn, options)
        })
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(f.user_ids(), vec!["1", "2"]);
    assert_eq!(f.pointer_keys(), vec!["alice", "bob"]);
}

//! Index rebuild, pruning and verification

use crate::common::{Fixture, User};
use strata_entities::{ErrorCode, PutMode};

#[test]
fn unchecked_bulk_load_then_rebuild() {
    let f = Fixture::new();
    f.db.update(|txn| {
        for i in 0..5 {
            f.users
                .entity_store()
                .put(txn, &User::new(&i.to_string(), &format!("bulk{}", i)))?;
        }
        Ok(())
    })
    .unwrap();

    let before = f.db.view(|txn| f.users.verify_index(txn)).unwrap();
    assert_eq!(before.unindexed_records.len(), 5);

    let written = f.db.update(|txn| f.users.rebuild_index(txn)).unwrap();
    assert_eq!(written, 5);
    assert_eq!(f.find(&User::by_name("bulk3")).unwrap().id, "3");
    assert!(f.db.view(|txn| f.users.verify_index(txn)).unwrap().is_consistent());
}

#[test]
fn rebuild_drops_dangling_pointers() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.db.update(|txn| f.users.index_store().put(txn, &User::new("9", "ghost")))
        .unwrap();

    f.db.update(|txn| f.users.rebuild_index(txn)).unwrap();
    assert_eq!(f.pointer_keys(), vec!["alice"]);
}

#[test]
fn rebuild_refuses_duplicate_unique_keys() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.db.update(|txn| f.users.put(txn, &User::new("2", "alice"), PutMode::Unchecked))
        .unwrap();

    let err = f.db.update(|txn| f.users.rebuild_index(txn)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
    // Rolled back: the original pointer is still there
    assert_eq!(f.pointer_keys(), vec!["alice"]);
}

#[test]
fn prune_removes_only_stale_pointers() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();
    // Leaves "alice" pointing at a record that now carries "alicia"
    f.create("1", "alicia").unwrap();
    f.db.update(|txn| f.users.index_store().put(txn, &User::new("9", "ghost")))
        .unwrap();

    let report = f.db.view(|txn| f.users.verify_index(txn)).unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.pointers, 4);
    assert_eq!(report.stale_pointers, vec![b"alice".to_vec(), b"ghost".to_vec()]);
    assert!(report.unindexed_records.is_empty());

    let pruned = f.db.update(|txn| f.users.prune_stale_pointers(txn)).unwrap();
    assert_eq!(pruned, 2);
    assert_eq!(f.pointer_keys(), vec!["alicia", "bob"]);
}

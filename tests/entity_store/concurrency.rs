//! Transactional behaviour of the store on the embedded engine

use std::sync::Barrier;
use std::thread;

use crate::common::{Fixture, User, USERS, USERS_BY_NAME};
use strata_entities::{
    BucketName, CancellationToken, ErrorCode, FindOptions, PutMode, StrataError, StrataResult,
    TransactionContext, TransactionMetrics, UnifiedStore,
};

#[test]
fn racing_creates_admit_exactly_one_owner() {
    const THREADS: usize = 8;
    let f = Fixture::new();
    let barrier = Barrier::new(THREADS);

    let results: Vec<Result<(), StrataError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let f = &f;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    f.create(&format!("u{}", i), "shared")
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code(), ErrorCode::Conflict);
    }
    assert_eq!(f.user_ids().len(), 1);
    assert_eq!(f.pointer_keys(), vec!["shared"]);
}

#[test]
fn first_committer_wins_on_overlapping_claims() {
    let f = Fixture::new();
    let mut t1 = f.db.begin_transaction(true);
    let mut t2 = f.db.begin_transaction(true);

    // Both see the name as free inside their own snapshot
    f.users.put(&mut t1, &User::new("1", "alice"), PutMode::New).unwrap();
    f.users.put(&mut t2, &User::new("2", "alice"), PutMode::New).unwrap();

    f.db.commit_transaction(&mut t1).unwrap();
    let err = f.db.commit_transaction(&mut t2).unwrap_err();
    assert!(matches!(err, StrataError::TransactionAborted { .. }));
    assert_eq!(err.code(), ErrorCode::Conflict);

    assert_eq!(f.find(&User::by_name("alice")).unwrap().id, "1");
    assert_eq!(f.user_ids(), vec!["1"]);
}

#[test]
fn disjoint_claims_both_commit() {
    let f = Fixture::new();
    let mut t1 = f.db.begin_transaction(true);
    let mut t2 = f.db.begin_transaction(true);

    f.users.put(&mut t1, &User::new("1", "alice"), PutMode::New).unwrap();
    f.users.put(&mut t2, &User::new("2", "bob"), PutMode::New).unwrap();

    f.db.commit_transaction(&mut t1).unwrap();
    f.db.commit_transaction(&mut t2).unwrap();
    assert_eq!(f.pointer_keys(), vec!["alice", "bob"]);
}

#[test]
fn readers_keep_their_snapshot() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    let mut reader = f.db.begin_transaction(false);
    f.db.update(|txn| f.users.put(txn, &User::new("1", "alicia"), PutMode::Update))
        .unwrap();

    let seen = f.users.find_ent(&mut reader, &User::by_name("alice")).unwrap();
    assert_eq!(seen.name, "alice");
    f.db.commit_transaction(&mut reader).unwrap();

    assert_eq!(f.find(&User::by_name("alicia")).unwrap().id, "1");
}

#[test]
fn cancelled_transactions_surface_cancellation() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = f
        .db
        .update_with_cancellation(token, |txn| {
            f.users.put(txn, &User::new("2", "bob"), PutMode::New)
        })
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.code(), ErrorCode::Cancelled);
    assert_eq!(f.user_ids(), vec!["1"]);
}

#[test]
fn metrics_count_commits_and_rollbacks() {
    let f = Fixture::new();
    let before = f.db.metrics();

    f.create("1", "alice").unwrap();
    f.create("2", "alice").unwrap_err();

    let after = f.db.metrics();
    assert_eq!(after.total_committed - before.total_committed, 1);
    assert_eq!(after.total_aborted - before.total_aborted, 1);
    assert_eq!(after.active_count, 0);
}

fn claim(f: &Fixture, txn: &mut TransactionContext, id: &str, name: &str) -> StrataResult<()> {
    f.users.put(txn, &User::new(id, name), PutMode::New)
}

#[test]
fn manual_transactions_commit_into_shared_storage() {
    let f = Fixture::new();
    let mut txn = f.db.begin_transaction(true);
    claim(&f, &mut txn, "1", "alice").unwrap();
    claim(&f, &mut txn, "2", "bob").unwrap();

    let storage: &UnifiedStore = f.db.storage();
    assert_eq!(storage.bucket_len(&BucketName::new(USERS)), 0);

    f.db.commit_transaction(&mut txn).unwrap();
    assert_eq!(storage.bucket_len(&BucketName::new(USERS)), 2);
    assert_eq!(storage.bucket_len(&BucketName::new(USERS_BY_NAME)), 2);
}

#[test]
fn abandoned_manual_transaction_leaves_no_trace() {
    let f = Fixture::new();
    let before: TransactionMetrics = f.db.metrics();

    let mut txn = f.db.begin_transaction(true);
    claim(&f, &mut txn, "1", "alice").unwrap();
    assert_eq!(f.db.metrics().active_count, before.active_count + 1);
    drop(txn);

    let after = f.db.metrics();
    assert_eq!(after.active_count, before.active_count);
    assert_eq!(after.total_completed(), before.total_completed());
    assert!(f.user_ids().is_empty());
}

#[test]
fn limited_scan_still_guards_the_whole_range() {
    let f = Fixture::new();
    f.create("1", "alice").unwrap();
    f.create("2", "bob").unwrap();

    let mut txn = f.db.begin_transaction(true);
    let first = f
        .users
        .find(&mut txn, FindOptions::new().limit(1))
        .unwrap()
        .collect::<StrataResult<Vec<_>>>()
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].1.id, "1");

    // Record 2 was never yielded but was still read
    f.db.update(|t| f.users.put(t, &User::new("2", "bobby"), PutMode::Update))
        .unwrap();
    claim(&f, &mut txn, "3", "carol").unwrap();
    let err = f.db.commit_transaction(&mut txn).unwrap_err();
    assert!(matches!(err, StrataError::TransactionAborted { .. }));
    assert_eq!(f.user_ids(), vec!["1", "2"]);
}

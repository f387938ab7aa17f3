//! Configuration files and logging setup

use std::time::Duration;

use crate::common::{Fixture, User};
use strata_entities::{init_logging, Database, ErrorCode, LoggingConfig, PutMode, StrataConfig, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn database_opens_from_a_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "transaction_timeout_ms = 5000\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let db = Database::open_with_config_file(&path).unwrap();
    assert_eq!(db.config().transaction_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(db.config().logging.level, "debug");

    let f = Fixture::with_db(db);
    f.create("1", "alice").unwrap();
    assert_eq!(f.find(&User::by_name("alice")).unwrap().id, "1");
}

#[test]
fn malformed_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "transaction_timeout_ms = \"soon\"\n").unwrap();

    let err = Database::open_with_config_file(&path).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Invalid);
}

#[test]
fn default_config_file_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    StrataConfig::write_default_if_missing(&path).unwrap();

    assert_eq!(StrataConfig::load(&path).unwrap(), StrataConfig::default());
}

#[test]
fn read_only_database_rejects_writes() {
    let db = Database::with_config(StrataConfig {
        read_only: true,
        ..StrataConfig::default()
    });
    let err = db
        .update(|txn| {
            let users = strata_entities::IndexedStore::<User>::new("user", "users", "users_by_name");
            users.init(txn)?;
            users.put(txn, &User::new("1", "alice"), PutMode::New)
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
}

#[test]
fn logging_initialises_at_most_once() {
    let config = LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    };
    // Another test binary may already own the global subscriber
    let first = init_logging(&config).unwrap();
    let second = init_logging(&config).unwrap();
    assert!(!(first && second));
}

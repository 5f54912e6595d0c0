mod helpers;

use secondbrain::db;
use secondbrain::memory::interactions::{InteractionStore, SqliteInteractionStore};
use secondbrain::memory::types::NewInteraction;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = helpers::test_db();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.interaction_count, 0);
    assert_eq!(report.note_count, 0);
    assert_eq!(report.link_count, 0);
    assert!(report.embedding_model.is_none());
}

#[test]
fn busy_timeout_and_wal_are_set() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("test.db")).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);

    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn turns_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("brain.db");

    let id = {
        let conn = db::open_database(&db_path).unwrap();
        let store = SqliteInteractionStore::new(Arc::new(Mutex::new(conn)));
        store
            .append(NewInteraction::new("q", "r").with_embedding(Some(helpers::test_embedding(3))))
            .unwrap()
            .id
    };

    let conn = db::open_database(&db_path).unwrap();
    let store = SqliteInteractionStore::new(Arc::new(Mutex::new(conn)));
    let records = store.all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].embedding.as_deref(), Some(helpers::test_embedding(3).as_slice()));
}

#[test]
fn concurrent_appends_are_never_torn() {
    let store = Arc::new(SqliteInteractionStore::new(helpers::shared_db()));

    let handles: Vec<_> = (0..8u8)
        .map(|seed| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..25 {
                    store
                        .append(
                            NewInteraction::new(format!("q{seed}-{i}"), "r")
                                .with_embedding(Some(helpers::test_embedding(seed))),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for _ in 0..10 {
        for record in store.all_records().unwrap() {
            assert_eq!(record.embedding.map(|e| e.len()), Some(64));
        }
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.count().unwrap(), 200);
}

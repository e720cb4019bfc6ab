//! Opening a store created by an older build must upgrade its records
//! in place, without data loss, exactly once.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

use daybook_core::{Database, Journal};

/// Lay down a database file the way a version-3 build would have left
/// it: no notes table, `user_version = 3`, and entry payloads still
/// carrying the legacy bookkeeping fields instead of an edit log.
fn create_v3_database(path: &Path, entry_payloads: &[serde_json::Value]) {
    let conn = Connection::open(path).expect("create v3 fixture");
    conn.execute_batch(
        r#"
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE moods (
            id TEXT PRIMARY KEY,
            date TEXT,
            path TEXT,
            payload TEXT NOT NULL
        );

        CREATE TABLE activities (
            id TEXT PRIMARY KEY,
            date TEXT,
            path TEXT,
            payload TEXT NOT NULL
        );

        CREATE TABLE entries (
            id TEXT PRIMARY KEY,
            date TEXT,
            path TEXT,
            payload TEXT NOT NULL
        );

        CREATE INDEX idx_entries_date ON entries(date);
        "#,
    )
    .expect("v3 schema");

    let device_id = Uuid::new_v4().to_string();
    for (key, value) in [
        ("device_id", device_id.as_str()),
        ("created_at", "2023-06-01T00:00:00+00:00"),
        ("last_modified", "2023-06-01T00:00:00+00:00"),
    ] {
        conn.execute("INSERT INTO meta (key, value) VALUES (?, ?)", [key, value])
            .expect("meta row");
    }

    for payload in entry_payloads {
        conn.execute(
            "INSERT INTO entries (id, date, path, payload) VALUES (?, ?, NULL, ?)",
            (
                payload["id"].as_str().expect("fixture id"),
                payload["date"].as_str().expect("fixture date"),
                payload.to_string(),
            ),
        )
        .expect("entry row");
    }

    conn.pragma_update(None, "user_version", 3).expect("stamp v3");
}

fn legacy_entry(id: &str, date: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "date": date,
        "mood": null,
        "note": "from the old days",
        "activities": {"running": 5.0, "coffee": ["espresso", "filter"]},
        "created": format!("{}T08:00:00+00:00", date),
        "updated": format!("{}T21:30:00+00:00", date),
        "createdBy": "mobile",
        "lastUpdatedBy": "web",
    })
}

#[test]
fn test_v3_store_migrates_forward_without_data_loss() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.daybook");
    create_v3_database(
        &path,
        &[
            legacy_entry("5f9c1c9a-7b87-4a8e-9f3f-0f1dfc2c8a01", "2023-05-01"),
            legacy_entry("5f9c1c9a-7b87-4a8e-9f3f-0f1dfc2c8a02", "2023-05-03"),
        ],
    );

    let db = Database::open(&path).expect("open v3 store");
    assert_eq!(db.stored_version(), 3);

    let journal = Journal::load(db).expect("load migrates records");
    assert_eq!(journal.entries().len(), 2);

    // Newest first after load.
    assert_eq!(journal.entries()[0].date.to_string(), "2023-05-03");

    for entry in journal.entries() {
        // created + materially different updated => two synthesized
        // events, original timestamps preserved.
        assert_eq!(entry.edit_log.len(), 2);
        assert_eq!(entry.edit_log[0].editing_tool, "mobile");
        assert_eq!(entry.edit_log[1].editing_tool, "web");
        assert_eq!(entry.note, "from the old days");
        assert_eq!(entry.activities.len(), 2);
    }
    drop(journal);

    // The upgraded payloads were written back and the version stamped:
    // a reopen sees a current-version store with no legacy fields.
    let db = Database::open(&path).expect("reopen");
    assert_eq!(db.stored_version(), 5);
    for record in db.get_all_raw("entries").expect("raw entries") {
        assert!(record.contains_key("editLog"));
        for legacy in ["created", "updated", "createdBy", "lastUpdatedBy"] {
            assert!(!record.contains_key(legacy));
        }
    }
}

#[test]
fn test_migrated_store_loads_idempotently() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.daybook");
    create_v3_database(
        &path,
        &[legacy_entry("5f9c1c9a-7b87-4a8e-9f3f-0f1dfc2c8a01", "2023-05-01")],
    );

    let first = {
        let journal = Journal::load(Database::open(&path).unwrap()).unwrap();
        journal.entries().to_vec()
    };
    let second = {
        let journal = Journal::load(Database::open(&path).unwrap()).unwrap();
        journal.entries().to_vec()
    };
    assert_eq!(first, second);
}

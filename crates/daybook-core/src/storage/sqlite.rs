//! SQLite-backed record store.
//!
//! One table per collection, each a keyed JSON document store with
//! optional secondary-key columns (`date`, `path`) extracted for
//! indexing. The stored schema version lives in `PRAGMA user_version`;
//! database identity lives in a `meta` key/value table.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{DaybookError, Result};
use crate::migration::{RecordMap, CURRENT_VERSION, OLDEST_SUPPORTED_VERSION};
use crate::model::StoredRecord;

/// Collections present since the oldest supported schema version.
const BASE_TABLES: &[&str] = &["moods", "activities", "entries"];

/// Change-notification callback, invoked with the collection name after
/// a write commits.
pub type ChangeListener = Box<dyn Fn(&str) + Send>;

/// File-backed SQLite record store.
pub struct Database {
    #[allow(dead_code)]
    path: PathBuf,
    conn: Mutex<Connection>,
    device_id: Uuid,
    /// Schema version the database was opened at, before any forward
    /// migration this process performs.
    stored_version: u32,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("device_id", &self.device_id)
            .field("stored_version", &self.stored_version)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Lock the database connection, returning an error if the mutex is
    /// poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DaybookError::StorageUnavailable("SQLite connection poisoned".to_string()))
    }

    /// Create a new journal database at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(DaybookError::StorageUnavailable(
                "Journal database already exists".to_string(),
            ));
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let device_id = Uuid::new_v4();
        let created_at = Utc::now().to_rfc3339();

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

            CREATE TABLE notes (
                id TEXT PRIMARY KEY,
                date TEXT,
                path TEXT,
                payload TEXT NOT NULL
            );

            CREATE INDEX idx_notes_date ON notes(date);
            CREATE INDEX idx_notes_path ON notes(path);
            "#,
        )?;

        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)",
            ["device_id", &device_id.to_string()],
        )?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)",
            ["created_at", &created_at],
        )?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)",
            ["last_modified", &created_at],
        )?;

        conn.pragma_update(None, "user_version", CURRENT_VERSION)?;

        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            device_id,
            stored_version: CURRENT_VERSION,
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Open an existing journal database.
    ///
    /// A database created by an older build (schema version 3 or 4) is
    /// brought up to the current table layout here; its *records* are
    /// migrated by the journal layer, which then calls
    /// [`Database::finish_migration`] to stamp the new version. A
    /// database newer than this build fails with
    /// `UnsupportedSchemaVersion` and is left untouched.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DaybookError::NotFound(format!(
                "Journal database not found at {}",
                path.display()
            )));
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let stored_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if stored_version > CURRENT_VERSION as i64
            || stored_version < OLDEST_SUPPORTED_VERSION as i64
        {
            return Err(DaybookError::UnsupportedSchemaVersion {
                declared: stored_version,
                highest: CURRENT_VERSION,
            });
        }
        let stored_version = stored_version as u32;

        if stored_version < 5 {
            tracing::info!(stored_version, "upgrading table layout to v5");
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS notes (
                    id TEXT PRIMARY KEY,
                    date TEXT,
                    path TEXT,
                    payload TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_notes_date ON notes(date);
                CREATE INDEX IF NOT EXISTS idx_notes_path ON notes(path);
                "#,
            )?;
        }

        let device_id_str: String = conn.query_row(
            "SELECT value FROM meta WHERE key = 'device_id'",
            [],
            |row| row.get(0),
        )?;
        let device_id = Uuid::parse_str(&device_id_str).map_err(|e| {
            DaybookError::StorageUnavailable(format!("Invalid device_id in metadata: {}", e))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            device_id,
            stored_version,
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    /// Schema version the database was opened at, before record
    /// migration.
    pub fn stored_version(&self) -> u32 {
        self.stored_version
    }

    /// Stamp the database as fully migrated to the current schema
    /// version. Called by the journal layer after every record has been
    /// upgraded and written back; if the process dies before this, the
    /// idempotent record migration simply re-runs on next open.
    pub fn finish_migration(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.pragma_update(None, "user_version", CURRENT_VERSION)?;
        Ok(())
    }

    /// Register a change listener, invoked with the collection name
    /// after each committed write.
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    fn notify(&self, collection: &str) {
        tracing::debug!(collection, "collection changed");
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(collection);
            }
        }
    }

    /// Store one record, assigning a fresh id when the record has none.
    /// Returns the stored record and notifies subscribers after the
    /// write commits.
    pub fn put<R: StoredRecord>(&self, mut record: R) -> Result<R> {
        if record.id().is_nil() {
            record.assign_id(Uuid::new_v4());
        }
        {
            let mut conn = self.lock_conn()?;
            let tx = conn.transaction()?;
            upsert_record(&tx, &record)?;
            touch_last_modified(&tx)?;
            tx.commit()?;
        }
        self.notify(R::COLLECTION);
        Ok(record)
    }

    /// Store a batch of records in one transaction with a single
    /// notification at the end. Used by bulk import.
    pub fn bulk_put<R: StoredRecord>(&self, records: &[R]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        {
            let mut conn = self.lock_conn()?;
            let tx = conn.transaction()?;
            for record in records {
                upsert_record(&tx, record)?;
            }
            touch_last_modified(&tx)?;
            tx.commit()?;
        }
        self.notify(R::COLLECTION);
        Ok(())
    }

    /// Load every record in a collection, typed. Payloads pass through
    /// serde scalar re-hydration only; schema migration is the
    /// caller's responsibility.
    pub fn get_all<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let payloads = self.payloads(R::COLLECTION)?;
        payloads
            .iter()
            .map(|payload| {
                serde_json::from_str(payload).map_err(|e| {
                    DaybookError::StorageUnavailable(format!(
                        "Corrupt {} payload: {}",
                        R::COLLECTION,
                        e
                    ))
                })
            })
            .collect()
    }

    /// Load every record in a collection as loose JSON maps, for the
    /// migration path.
    pub fn get_all_raw(&self, collection: &str) -> Result<Vec<RecordMap>> {
        let payloads = self.payloads(collection)?;
        payloads
            .iter()
            .map(|payload| {
                serde_json::from_str(payload).map_err(|e| {
                    DaybookError::StorageUnavailable(format!(
                        "Corrupt {} payload: {}",
                        collection, e
                    ))
                })
            })
            .collect()
    }

    fn payloads(&self, collection: &str) -> Result<Vec<String>> {
        debug_assert!(is_known_collection(collection));
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT payload FROM {} ORDER BY id",
            collection
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut payloads = Vec::new();
        for row in rows {
            payloads.push(row?);
        }
        Ok(payloads)
    }

    /// Delete a record by id. Absent ids are a no-op, not an error;
    /// subscribers are notified only when a row was removed.
    pub fn delete<R: StoredRecord>(&self, id: Uuid) -> Result<bool> {
        let removed = {
            let mut conn = self.lock_conn()?;
            let tx = conn.transaction()?;
            let removed = tx.execute(
                &format!("DELETE FROM {} WHERE id = ?", R::COLLECTION),
                [id.to_string()],
            )?;
            if removed > 0 {
                touch_last_modified(&tx)?;
            }
            tx.commit()?;
            removed > 0
        };
        if removed {
            self.notify(R::COLLECTION);
        }
        Ok(removed)
    }
}

fn is_known_collection(collection: &str) -> bool {
    collection == "notes" || BASE_TABLES.contains(&collection)
}

fn upsert_record<R: StoredRecord>(tx: &rusqlite::Transaction<'_>, record: &R) -> Result<()> {
    let payload = serde_json::to_string(record).map_err(|e| {
        DaybookError::Validation(format!("Failed to serialize {}: {}", R::COLLECTION, e))
    })?;
    tx.execute(
        &format!(
            r#"
            INSERT INTO {} (id, date, path, payload)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET date = ?2, path = ?3, payload = ?4
            "#,
            R::COLLECTION
        ),
        (
            record.id().to_string(),
            record.date_key().map(|date| date.to_string()),
            record.path_key(),
            payload,
        ),
    )?;
    Ok(())
}

fn touch_last_modified(tx: &rusqlite::Transaction<'_>) -> Result<()> {
    tx.execute(
        "UPDATE meta SET value = ? WHERE key = 'last_modified'",
        [Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

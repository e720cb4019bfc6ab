//! Durable keyed storage for the journal's collections.
//!
//! The database holds four collections (`moods`, `activities`,
//! `entries` indexed by id and date, `notes` indexed by id, date, and
//! path) as JSON payloads keyed by id. Loading performs scalar
//! re-hydration via serde but
//! **not** schema migration; migration is the journal layer's explicit
//! responsibility, applied once per record per process lifetime.

mod sqlite;

pub use sqlite::Database;

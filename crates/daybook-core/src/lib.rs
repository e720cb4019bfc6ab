//! # Daybook Core
//!
//! Core library for Daybook - a local-first personal mood and activity
//! journal.
//!
//! This crate provides the data model, schema migration engine, record
//! store, and statistics aggregation independent of any UI.
//!
//! ## Architecture
//!
//! - **model**: record shapes (entries, moods, activities, notes)
//! - **migration**: schema version registry and upgrade/import engine
//! - **storage**: SQLite-backed keyed record store
//! - **journal**: the authoritative entry collection and its lifecycle
//! - **stats**: on-demand aggregation (frequency, recency, summaries)

pub mod error;
pub mod journal;
pub mod migration;
pub mod model;
pub mod stats;
pub mod storage;

pub use error::{DaybookError, Result};
pub use journal::{EntryDraft, ImportReport, Journal, RejectedRecord};
pub use model::{Activity, ActivityDetail, EditEvent, Entry, ExportDocument, Mood, Note};
pub use storage::Database;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

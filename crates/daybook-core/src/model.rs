//! Core record types for the journal.
//!
//! These types are the normalized, current-version shapes. Records read
//! from an older store or an external export pass through the migration
//! engine (`crate::migration`) before they are deserialized into them.
//!
//! Persisted and exported JSON uses camelCase field names (`editLog`,
//! `durationMs`, `isArchived`) because the export document is a contract
//! shared with older builds of the application.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DaybookError, Result};

/// One edit session recorded against an entry or note.
///
/// The first event of a record's `edit_log` is its creation; every later
/// event is one edit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    /// When the session ended.
    pub timestamp: DateTime<Utc>,

    /// How long the session lasted.
    pub duration_ms: u64,

    /// Which tool performed the edit (e.g., "cli", "import").
    pub editing_tool: String,
}

impl EditEvent {
    pub fn now(duration_ms: u64, editing_tool: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            duration_ms,
            editing_tool: editing_tool.into(),
        }
    }
}

/// The value attached to an activity on an entry.
///
/// Either a running numeric counter ("how many times / how much") or an
/// ordered list of free-text items ("which specific items"). Never both
/// at once for a given activity on a given entry. The wire form is the
/// bare JSON value (`3.5` or `["espresso", "tea"]`), hence `untagged`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityDetail {
    Count(f64),
    List(Vec<String>),
}

impl ActivityDetail {
    /// Human-readable kind name, used in precondition errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityDetail::Count(_) => "count",
            ActivityDetail::List(_) => "list",
        }
    }

    pub fn as_count(&self) -> Option<f64> {
        match self {
            ActivityDetail::Count(n) => Some(*n),
            ActivityDetail::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ActivityDetail::Count(_) => None,
            ActivityDetail::List(items) => Some(items),
        }
    }
}

/// One journaled day-or-moment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier, assigned at creation, immutable. Records
    /// imported without one get a fresh id (nil is the "unassigned"
    /// sentinel).
    #[serde(default)]
    pub id: Uuid,

    /// Calendar date the entry belongs to. Not unique: multiple entries
    /// may share a date.
    pub date: NaiveDate,

    /// Referenced mood, or `None` when unset.
    #[serde(default)]
    pub mood: Option<Uuid>,

    /// Free-text note body.
    #[serde(default)]
    pub note: String,

    /// Activity id -> recorded detail for this entry.
    #[serde(default)]
    pub activities: BTreeMap<String, ActivityDetail>,

    /// Append-only edit history, oldest first. Never empty for a
    /// persisted entry; the first event is the creation.
    #[serde(default)]
    pub edit_log: Vec<EditEvent>,
}

impl Entry {
    /// Create a new entry for `date` with a single creation event.
    pub fn new(date: NaiveDate, editing_tool: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            mood: None,
            note: String::new(),
            activities: BTreeMap::new(),
            edit_log: vec![EditEvent::now(0, editing_tool)],
        }
    }

    /// Append one edit session to the log.
    pub fn record_edit(&mut self, duration_ms: u64, editing_tool: impl Into<String>) {
        self.edit_log.push(EditEvent::now(duration_ms, editing_tool));
    }

    /// Creation time, taken from the first edit-log event.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.edit_log.first().map(|event| event.timestamp)
    }
}

/// A selectable mood, rated 1 (worst) to 5 (best).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mood {
    pub id: Uuid,
    pub name: String,
    pub emoji: String,
    pub rating: u8,
    pub created: DateTime<Utc>,
}

impl Mood {
    /// Create a mood, validating the rating range.
    pub fn new(name: impl Into<String>, emoji: impl Into<String>, rating: u8) -> Result<Self> {
        if !(1..=5).contains(&rating) {
            return Err(DaybookError::Validation(format!(
                "Mood rating must be between 1 and 5, got {}",
                rating
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            emoji: emoji.into(),
            rating,
            created: Utc::now(),
        })
    }
}

/// A trackable activity.
///
/// Archived activities are excluded from default listings but retained
/// in history and stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub name: String,
    pub emoji: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    pub created: DateTime<Utc>,
}

impl Activity {
    pub fn new(name: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            emoji: emoji.into(),
            category: None,
            is_archived: false,
            created: Utc::now(),
        }
    }
}

/// A free-standing note, grouped into a folder-like path derived from a
/// trailing `#tag` line in its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub date: NaiveDate,
    pub path: String,
    pub content: String,
    pub edit_log: Vec<EditEvent>,
}

impl Note {
    /// Create a note for `date`, deriving its path from the content.
    pub fn new(date: NaiveDate, content: impl Into<String>, editing_tool: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4(),
            date,
            path: derive_note_path(&content),
            content,
            edit_log: vec![EditEvent::now(0, editing_tool)],
        }
    }

    /// Replace the content, re-deriving the path and appending an edit
    /// session.
    pub fn set_content(&mut self, content: impl Into<String>, duration_ms: u64, editing_tool: impl Into<String>) {
        self.content = content.into();
        self.path = derive_note_path(&self.content);
        self.edit_log.push(EditEvent::now(duration_ms, editing_tool));
    }
}

/// Derive a note's grouping path from a trailing `#tag` line.
///
/// Only the last non-empty line counts, and only when it starts with `#`.
pub fn derive_note_path(content: &str) -> String {
    content
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.trim().strip_prefix('#'))
        .map(|tag| tag.trim().to_string())
        .unwrap_or_default()
}

/// The backup/export document.
///
/// `version` identifies the schema version `entries` was serialized
/// under; absence means the oldest supported version. Entries stay as
/// raw JSON so the migration engine can transform them before they are
/// deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub entries: Vec<serde_json::Value>,
    #[serde(default)]
    pub activities: Vec<serde_json::Value>,
    #[serde(default)]
    pub moods: Vec<serde_json::Value>,
    #[serde(default)]
    pub version: Option<i64>,
}

/// A record the store can persist: a collection name, an id, and
/// optional secondary keys extracted into indexed columns.
pub trait StoredRecord: Serialize + DeserializeOwned {
    /// Collection (table) this record lives in.
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;

    /// Assign a store-generated id. Called by `put` when the id is nil.
    fn assign_id(&mut self, id: Uuid);

    /// Secondary date key, for collections indexed by date.
    fn date_key(&self) -> Option<NaiveDate> {
        None
    }

    /// Secondary path key, for collections indexed by path.
    fn path_key(&self) -> Option<&str> {
        None
    }
}

impl StoredRecord for Entry {
    const COLLECTION: &'static str = "entries";

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn date_key(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl StoredRecord for Mood {
    const COLLECTION: &'static str = "moods";

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

impl StoredRecord for Activity {
    const COLLECTION: &'static str = "activities";

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

impl StoredRecord for Note {
    const COLLECTION: &'static str = "notes";

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn date_key(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn path_key(&self) -> Option<&str> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_detail_wire_shape() {
        let count: ActivityDetail = serde_json::from_str("2.5").unwrap();
        assert_eq!(count, ActivityDetail::Count(2.5));

        let list: ActivityDetail = serde_json::from_str(r#"["espresso","tea"]"#).unwrap();
        assert_eq!(
            list,
            ActivityDetail::List(vec!["espresso".to_string(), "tea".to_string()])
        );

        assert_eq!(serde_json::to_string(&ActivityDetail::Count(3.0)).unwrap(), "3.0");
    }

    #[test]
    fn test_new_entry_has_creation_event() {
        let entry = Entry::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "test");
        assert_eq!(entry.edit_log.len(), 1);
        assert_eq!(entry.edit_log[0].editing_tool, "test");
        assert_eq!(entry.created_at(), Some(entry.edit_log[0].timestamp));
    }

    #[test]
    fn test_entry_json_uses_camel_case() {
        let entry = Entry::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "test");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("editLog").is_some());
        assert!(value["editLog"][0].get("durationMs").is_some());
        assert!(value["editLog"][0].get("editingTool").is_some());
    }

    #[test]
    fn test_mood_rating_validated() {
        assert!(Mood::new("great", "😀", 5).is_ok());
        assert!(Mood::new("off-scale", "🤯", 0).is_err());
        assert!(Mood::new("off-scale", "🤯", 6).is_err());
    }

    #[test]
    fn test_derive_note_path() {
        assert_eq!(derive_note_path("groceries\nmilk, eggs\n#shopping"), "shopping");
        assert_eq!(derive_note_path("groceries\n#shopping\n\n"), "shopping");
        assert_eq!(derive_note_path("no tag here"), "");
        assert_eq!(derive_note_path("# spaced \n"), "spaced");
        assert_eq!(derive_note_path(""), "");
    }

    #[test]
    fn test_note_path_tracks_content() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut note = Note::new(date, "list\n#errands", "test");
        assert_eq!(note.path, "errands");

        note.set_content("list", 1200, "test");
        assert_eq!(note.path, "");
        assert_eq!(note.edit_log.len(), 2);
    }
}

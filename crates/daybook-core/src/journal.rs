//! The authoritative in-memory entry collection and its lifecycle
//! operations.
//!
//! The journal keeps entries sorted by date descending (stable for
//! same-date ties within a session) and bumps a revision counter on
//! every mutation; the stats engine memoizes against that revision.
//! Records loaded from an older store pass through the migration engine
//! exactly once per process lifetime, then the upgraded payloads are
//! written back.

use std::collections::btree_map::Entry as MapSlot;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DaybookError, Result};
use crate::migration::{self, RecordMap, CURRENT_VERSION, OLDEST_SUPPORTED_VERSION};
use crate::model::{
    Activity, ActivityDetail, EditEvent, Entry, ExportDocument, Mood, Note, StoredRecord,
};
use crate::storage::Database;

/// Partial entry fields for insert/upsert.
///
/// Absent fields leave the existing record untouched on upsert and take
/// defaults on insert.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    /// Target entry for upsert; `None` always inserts.
    pub id: Option<Uuid>,

    pub date: NaiveDate,

    pub mood: Option<Uuid>,

    pub note: Option<String>,

    pub activities: Option<BTreeMap<String, ActivityDetail>>,
}

impl EntryDraft {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_mood(mut self, mood: Uuid) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_activities(mut self, activities: BTreeMap<String, ActivityDetail>) -> Self {
        self.activities = Some(activities);
        self
    }
}

/// One record rejected during bulk import, with the reason.
#[derive(Debug, Clone)]
pub struct RejectedRecord {
    pub collection: &'static str,
    pub index: usize,
    pub reason: String,
}

/// Outcome of a bulk import: per-record failures are reported, not
/// silently dropped, and do not abort the rest of the batch.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub entries_imported: usize,
    pub moods_imported: usize,
    pub activities_imported: usize,
    pub rejected: Vec<RejectedRecord>,
}

/// The entry lifecycle component: owns the in-memory entry collection
/// and the database handle.
pub struct Journal {
    db: Database,
    entries: Vec<Entry>,
    revision: u64,
}

impl Journal {
    /// Load the journal from an opened database, migrating records from
    /// the stored schema version where needed.
    pub fn load(db: Database) -> Result<Self> {
        let stored_version = db.stored_version();
        let raw = db.get_all_raw(Entry::COLLECTION)?;

        let mut entries = Vec::with_capacity(raw.len());
        for mut record in raw {
            if stored_version < CURRENT_VERSION {
                migration::upgrade_in_place(&mut record, stored_version, CURRENT_VERSION)?;
            }
            entries.push(deserialize_entry(record)?);
        }

        if stored_version < CURRENT_VERSION {
            tracing::info!(
                from = stored_version,
                to = CURRENT_VERSION,
                count = entries.len(),
                "migrated entries to current schema"
            );
            db.bulk_put(&entries)?;
            db.finish_migration()?;
        }

        sort_entries(&mut entries);
        Ok(Self {
            db,
            entries,
            revision: 0,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Entries, newest date first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Monotonic collection identity; bumped on every entry mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// All entries for a date; zero or more matches.
    pub fn get_by_date(&self, date: NaiveDate) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|entry| entry.date == date)
            .collect()
    }

    /// Insert a new entry from the draft, assigning a fresh id and a
    /// single creation event.
    pub fn insert(&mut self, draft: EntryDraft, editing_tool: &str) -> Result<Entry> {
        let mut entry = Entry::new(draft.date, editing_tool);
        if let Some(mood) = draft.mood {
            entry.mood = Some(mood);
        }
        if let Some(note) = draft.note {
            entry.note = note;
        }
        if let Some(activities) = draft.activities {
            entry.activities = activities;
        }

        let entry = self.db.put(entry)?;
        self.entries.push(entry.clone());
        sort_entries(&mut self.entries);
        self.revision += 1;
        Ok(entry)
    }

    /// Merge the draft onto an existing entry (appending one edit
    /// session with the caller-computed duration), or insert when no
    /// entry matches the draft id.
    pub fn upsert(&mut self, draft: EntryDraft, duration_ms: u64, editing_tool: &str) -> Result<Entry> {
        let Some(id) = draft.id else {
            return self.insert(draft, editing_tool);
        };
        let Some(existing) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return self.insert(draft, editing_tool);
        };

        existing.date = draft.date;
        if let Some(mood) = draft.mood {
            existing.mood = Some(mood);
        }
        if let Some(note) = draft.note {
            existing.note = note;
        }
        if let Some(activities) = draft.activities {
            existing.activities = activities;
        }
        existing.record_edit(duration_ms, editing_tool);
        let updated = existing.clone();

        // The in-memory record has changed; the revision must track it
        // even if the save below fails. The pending edit stays resident
        // either way.
        self.revision += 1;
        sort_entries(&mut self.entries);
        self.db.put(updated.clone())?;
        Ok(updated)
    }

    /// Hard delete. Removal preserves order, so no re-sort.
    pub fn remove(&mut self, id: Uuid) -> Result<bool> {
        let removed = self.db.delete::<Entry>(id)?;
        if removed {
            self.entries.retain(|entry| entry.id != id);
            self.revision += 1;
        }
        Ok(removed)
    }

    /// Import raw entry records exported at `declared_version`
    /// (defaulting to the oldest supported version, for pre-versioning
    /// exports).
    ///
    /// Per-record migration or parse failures are reported and skipped;
    /// accepted records are inserted with a single sort and a single
    /// store write at the end of the batch.
    pub fn bulk_import(
        &mut self,
        raw_entries: Vec<Value>,
        declared_version: Option<i64>,
        origin_tool: &str,
    ) -> Result<ImportReport> {
        let declared =
            declared_version.unwrap_or(OLDEST_SUPPORTED_VERSION as i64);
        // An unknown version rejects the whole import before any record
        // is touched.
        if !(OLDEST_SUPPORTED_VERSION as i64..=CURRENT_VERSION as i64).contains(&declared) {
            return Err(DaybookError::UnsupportedSchemaVersion {
                declared,
                highest: CURRENT_VERSION,
            });
        }

        let mut report = ImportReport::default();
        let mut accepted: Vec<Entry> = Vec::with_capacity(raw_entries.len());

        for (index, value) in raw_entries.into_iter().enumerate() {
            match import_entry(value, declared, origin_tool) {
                Ok(entry) => accepted.push(entry),
                Err(err) => report.rejected.push(RejectedRecord {
                    collection: Entry::COLLECTION,
                    index,
                    reason: err.to_string(),
                }),
            }
        }

        if !accepted.is_empty() {
            self.db.bulk_put(&accepted)?;
            // Replace any resident entries the import overwrote by id,
            // then sort once for the whole batch.
            self.entries
                .retain(|entry| !accepted.iter().any(|imported| imported.id == entry.id));
            self.entries.extend(accepted.iter().cloned());
            sort_entries(&mut self.entries);
            self.revision += 1;
        }

        report.entries_imported = accepted.len();
        Ok(report)
    }

    /// Import a full export document: entries through the migration
    /// engine, moods and activities as typed records.
    pub fn import_document(
        &mut self,
        document: ExportDocument,
        origin_tool: &str,
    ) -> Result<ImportReport> {
        let declared = document
            .version
            .unwrap_or(OLDEST_SUPPORTED_VERSION as i64);
        let mut report = self.bulk_import(document.entries, Some(declared), origin_tool)?;

        let moods = import_typed::<Mood>(document.moods, &mut report.rejected);
        self.db.bulk_put(&moods)?;
        report.moods_imported = moods.len();

        let activities = import_typed::<Activity>(document.activities, &mut report.rejected);
        self.db.bulk_put(&activities)?;
        report.activities_imported = activities.len();

        Ok(report)
    }

    /// Build a current-version export document.
    pub fn export(&self) -> Result<ExportDocument> {
        let moods: Vec<Mood> = self.db.get_all()?;
        let activities: Vec<Activity> = self.db.get_all()?;
        Ok(ExportDocument {
            entries: self
                .entries
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<_, _>>()?,
            activities: activities
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<_, _>>()?,
            moods: moods
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<_, _>>()?,
            version: Some(CURRENT_VERSION as i64),
        })
    }

    // --- ActivityDetail helpers ---

    /// Add to a numeric detail, treating an absent detail as zero.
    /// A list-typed detail fails with a precondition error and is left
    /// unchanged.
    pub fn add_to_numeric(&mut self, entry_id: Uuid, activity_id: &str, amount: f64) -> Result<()> {
        let entry = self.entry_mut(entry_id)?;
        match entry.activities.entry(activity_id.to_string()) {
            MapSlot::Vacant(slot) => {
                slot.insert(ActivityDetail::Count(amount));
            }
            MapSlot::Occupied(mut slot) => match slot.get_mut() {
                ActivityDetail::Count(value) => *value += amount,
                ActivityDetail::List(_) => {
                    return Err(DaybookError::DetailKindMismatch {
                        activity: activity_id.to_string(),
                        held: "list",
                        requested: "count",
                    });
                }
            },
        }
        self.persist_entry(entry_id)
    }

    /// Append to a list detail, creating a single-element list when
    /// absent. A numeric detail fails with a precondition error and is
    /// left unchanged.
    pub fn add_to_list(&mut self, entry_id: Uuid, activity_id: &str, text: impl Into<String>) -> Result<()> {
        let entry = self.entry_mut(entry_id)?;
        match entry.activities.entry(activity_id.to_string()) {
            MapSlot::Vacant(slot) => {
                slot.insert(ActivityDetail::List(vec![text.into()]));
            }
            MapSlot::Occupied(mut slot) => match slot.get_mut() {
                ActivityDetail::List(items) => items.push(text.into()),
                ActivityDetail::Count(_) => {
                    return Err(DaybookError::DetailKindMismatch {
                        activity: activity_id.to_string(),
                        held: "count",
                        requested: "list",
                    });
                }
            },
        }
        self.persist_entry(entry_id)
    }

    /// Replace one list item. Out-of-bounds indices are a caller error,
    /// not clamped.
    pub fn update_list_item(
        &mut self,
        entry_id: Uuid,
        activity_id: &str,
        index: usize,
        text: impl Into<String>,
    ) -> Result<()> {
        let entry = self.entry_mut(entry_id)?;
        let items = list_items_mut(entry, activity_id)?;
        if index >= items.len() {
            return Err(DaybookError::IndexOutOfRange {
                index,
                len: items.len(),
            });
        }
        items[index] = text.into();
        self.persist_entry(entry_id)
    }

    /// Remove one list item. Out-of-bounds indices are a caller error.
    pub fn remove_list_item(&mut self, entry_id: Uuid, activity_id: &str, index: usize) -> Result<()> {
        let entry = self.entry_mut(entry_id)?;
        let items = list_items_mut(entry, activity_id)?;
        if index >= items.len() {
            return Err(DaybookError::IndexOutOfRange {
                index,
                len: items.len(),
            });
        }
        items.remove(index);
        self.persist_entry(entry_id)
    }

    /// Delete the detail key entirely. "No detail" is a third state,
    /// distinct from zero and from an empty list.
    pub fn clear_detail(&mut self, entry_id: Uuid, activity_id: &str) -> Result<()> {
        let entry = self.entry_mut(entry_id)?;
        entry.activities.remove(activity_id);
        self.persist_entry(entry_id)
    }

    // --- Mood / Activity / Note passthroughs ---

    pub fn add_mood(&self, name: &str, emoji: &str, rating: u8) -> Result<Mood> {
        let mood = Mood::new(name, emoji, rating)?;
        self.db.put(mood)
    }

    pub fn moods(&self) -> Result<Vec<Mood>> {
        self.db.get_all()
    }

    pub fn add_activity(&self, name: &str, emoji: &str, category: Option<String>) -> Result<Activity> {
        let mut activity = Activity::new(name, emoji);
        activity.category = category;
        self.db.put(activity)
    }

    /// Activities, optionally including archived ones. Archived
    /// activities stay out of default listings but remain in history
    /// and stats.
    pub fn activities(&self, include_archived: bool) -> Result<Vec<Activity>> {
        let mut activities: Vec<Activity> = self.db.get_all()?;
        if !include_archived {
            activities.retain(|activity| !activity.is_archived);
        }
        Ok(activities)
    }

    pub fn set_activity_archived(&self, id: Uuid, archived: bool) -> Result<Activity> {
        let activities: Vec<Activity> = self.db.get_all()?;
        let mut activity = activities
            .into_iter()
            .find(|activity| activity.id == id)
            .ok_or_else(|| DaybookError::NotFound(format!("Activity {}", id)))?;
        activity.is_archived = archived;
        self.db.put(activity)
    }

    pub fn add_note(&self, date: NaiveDate, content: &str, editing_tool: &str) -> Result<Note> {
        self.db.put(Note::new(date, content, editing_tool))
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        self.db.get_all()
    }

    // --- internals ---

    fn entry_mut(&mut self, id: Uuid) -> Result<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| DaybookError::NotFound(format!("Entry {}", id)))
    }

    fn persist_entry(&mut self, id: Uuid) -> Result<()> {
        let entry = self
            .get_by_id(id)
            .ok_or_else(|| DaybookError::NotFound(format!("Entry {}", id)))?
            .clone();
        // The in-memory mutation has already happened; the revision
        // must track it even if the save fails.
        self.revision += 1;
        self.db.put(entry)?;
        Ok(())
    }
}

fn sort_entries(entries: &mut [Entry]) {
    // Stable sort: same-date entries keep their in-session order.
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

fn list_items_mut<'a>(entry: &'a mut Entry, activity_id: &str) -> Result<&'a mut Vec<String>> {
    match entry.activities.get_mut(activity_id) {
        Some(ActivityDetail::List(items)) => Ok(items),
        Some(ActivityDetail::Count(_)) => Err(DaybookError::DetailKindMismatch {
            activity: activity_id.to_string(),
            held: "count",
            requested: "list",
        }),
        None => Err(DaybookError::NotFound(format!(
            "No list detail '{}' on entry",
            activity_id
        ))),
    }
}

fn deserialize_entry(record: RecordMap) -> Result<Entry> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| DaybookError::Validation(format!("Malformed entry record: {}", e)))
}

fn import_entry(value: Value, declared: i64, origin_tool: &str) -> Result<Entry> {
    let Value::Object(mut record) = value else {
        return Err(DaybookError::Validation(
            "Entry record is not an object".to_string(),
        ));
    };
    migration::import_from_version(&mut record, declared)?;
    let mut entry = deserialize_entry(record)?;
    if entry.id.is_nil() {
        entry.id = Uuid::new_v4();
    }
    // The edit log must never be empty for a persisted entry; a record
    // that arrives without one gets a creation event stamped with the
    // import's origin tool.
    if entry.edit_log.is_empty() {
        entry.edit_log.push(EditEvent::now(0, origin_tool));
    }
    Ok(entry)
}

fn import_typed<R: StoredRecord>(
    values: Vec<Value>,
    rejected: &mut Vec<RejectedRecord>,
) -> Vec<R> {
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<R>(value) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push(RejectedRecord {
                collection: R::COLLECTION,
                index,
                reason: e.to_string(),
            }),
        }
    }
    records
}

//! The export document is the sole bit-exact contract the migration
//! engine honors on import: current-version round trips are identity,
//! stale exports land on the live shape, unknown versions are refused.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tempfile::TempDir;

use daybook_core::{
    ActivityDetail, Database, DaybookError, EntryDraft, ExportDocument, Journal,
};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn temp_journal(dir: &TempDir, name: &str) -> Journal {
    let db = Database::create(&dir.path().join(name)).unwrap();
    Journal::load(db).unwrap()
}

fn seeded_journal(dir: &TempDir, name: &str) -> Journal {
    let mut journal = temp_journal(dir, name);

    let mood = journal.add_mood("bright", "😄", 5).unwrap();
    journal.add_activity("coffee", "☕", None).unwrap();

    let mut activities = BTreeMap::new();
    activities.insert(
        "coffee".to_string(),
        ActivityDetail::List(vec!["espresso".to_string()]),
    );
    activities.insert("pushups".to_string(), ActivityDetail::Count(25.0));
    journal
        .insert(
            EntryDraft::new(date("2024-02-01"))
                .with_mood(mood.id)
                .with_note("good start")
                .with_activities(activities),
            "test",
        )
        .unwrap();
    journal
        .insert(EntryDraft::new(date("2024-02-03")), "test")
        .unwrap();
    journal
}

#[test]
fn test_current_version_round_trip_is_identity() {
    let dir = TempDir::new().unwrap();
    let journal = seeded_journal(&dir, "source.daybook");
    let document = journal.export().unwrap();
    assert_eq!(document.version, Some(5));
    assert_eq!(document.entries.len(), 2);

    let mut target = temp_journal(&dir, "target.daybook");
    let report = target.import_document(document, "import").unwrap();
    assert_eq!(report.entries_imported, 2);
    assert_eq!(report.moods_imported, 1);
    assert_eq!(report.activities_imported, 1);
    assert!(report.rejected.is_empty());

    assert_eq!(target.entries(), journal.entries());
    assert_eq!(target.moods().unwrap(), journal.moods().unwrap());
    assert_eq!(
        target.activities(true).unwrap(),
        journal.activities(true).unwrap()
    );
}

#[test]
fn test_pre_versioning_export_defaults_to_oldest_version() {
    let dir = TempDir::new().unwrap();
    let mut journal = temp_journal(&dir, "journal.daybook");

    // No `version` field: a pre-versioning export, still carrying the
    // legacy bookkeeping fields.
    let document: ExportDocument = serde_json::from_value(serde_json::json!({
        "entries": [{
            "id": "5f9c1c9a-7b87-4a8e-9f3f-0f1dfc2c8a21",
            "date": "2022-11-05",
            "note": "ancient",
            "activities": {"walk": 1.0},
            "created": "2022-11-05T10:00:00+00:00",
            "createdBy": "mobile",
        }],
        "activities": [],
        "moods": [],
    }))
    .unwrap();
    assert_eq!(document.version, None);

    let report = journal.import_document(document, "import").unwrap();
    assert_eq!(report.entries_imported, 1);

    let entry = &journal.entries()[0];
    assert_eq!(entry.date, date("2022-11-05"));
    assert_eq!(entry.edit_log.len(), 1);
    assert_eq!(entry.edit_log[0].editing_tool, "mobile");
}

#[test]
fn test_unknown_version_rejected_store_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut journal = seeded_journal(&dir, "journal.daybook");
    let before = journal.entries().to_vec();

    let document: ExportDocument = serde_json::from_value(serde_json::json!({
        "entries": [{"date": "2024-03-01", "activities": {}}],
        "activities": [],
        "moods": [],
        "version": 99,
    }))
    .unwrap();

    let err = journal.import_document(document, "import").unwrap_err();
    assert!(matches!(
        err,
        DaybookError::UnsupportedSchemaVersion { declared: 99, .. }
    ));
    assert_eq!(journal.entries(), before.as_slice());
}

#[test]
fn test_import_survives_process_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.daybook");
    {
        let mut journal = Journal::load(Database::create(&path).unwrap()).unwrap();
        let document: ExportDocument = serde_json::from_value(serde_json::json!({
            "entries": [{
                "id": "5f9c1c9a-7b87-4a8e-9f3f-0f1dfc2c8a31",
                "date": "2024-01-02",
                "activities": {"coffee": ["espresso"]},
                "created": "2024-01-02T07:00:00+00:00",
                "createdBy": "mobile",
            }],
            "version": 3,
        }))
        .unwrap();
        journal.import_document(document, "import").unwrap();
    }

    let journal = Journal::load(Database::open(&path).unwrap()).unwrap();
    assert_eq!(journal.entries().len(), 1);
    assert_eq!(
        journal.entries()[0].activities["coffee"],
        ActivityDetail::List(vec!["espresso".to_string()])
    );
}

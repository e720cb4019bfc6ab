//! Schema version registry and migration engine.
//!
//! Each schema version registers three behaviors: an idempotency guard
//! (`needs_to_run`), an in-place structural `upgrade` applied to records
//! already resident in the live store, and an `import_transform` applied
//! to records arriving from an external export of that vintage.
//!
//! `import_transform` only repairs wire-format scalar encoding (date and
//! timestamp fields back to canonical strings). `upgrade` performs
//! structural evolution and runs for every intervening version, so a
//! version-3 export lands on the same shape as a record that lived
//! through versions 3, 4, and 5 natively.
//!
//! Steps operate on the loose `serde_json::Map` form of a record because
//! pre-v4 records carry fields (`created`, `updated`, `createdBy`,
//! `lastUpdatedBy`) that no longer exist on the typed `Entry`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{DaybookError, Result};

/// Oldest schema version with a registered migration path.
pub const OLDEST_SUPPORTED_VERSION: u32 = 3;

/// The schema version this build reads and writes natively.
pub const CURRENT_VERSION: u32 = 5;

/// Loose record shape the migration steps mutate.
pub type RecordMap = Map<String, Value>;

/// One registered schema version.
pub struct MigrationStep {
    pub version: u32,
    pub description: &'static str,
    needs_to_run: fn(&RecordMap) -> bool,
    upgrade: fn(&mut RecordMap) -> Result<()>,
    import_transform: fn(&mut RecordMap) -> Result<()>,
}

/// The total, ordered version registry.
pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        version: 3,
        description: "Baseline: moods, activities, entries collections",
        needs_to_run: never_runs,
        upgrade: upgrade_noop,
        import_transform: normalize_scalars,
    },
    MigrationStep {
        version: 4,
        description: "Introduce editLog, retiring created/updated/createdBy/lastUpdatedBy",
        needs_to_run: v4_needs_to_run,
        upgrade: v4_upgrade,
        import_transform: normalize_scalars,
    },
    MigrationStep {
        version: 5,
        description: "Add the notes collection",
        needs_to_run: never_runs,
        upgrade: upgrade_noop,
        import_transform: normalize_scalars,
    },
];

fn step_for(version: u32) -> Option<&'static MigrationStep> {
    MIGRATIONS.iter().find(|step| step.version == version)
}

fn unsupported(declared: i64) -> DaybookError {
    DaybookError::UnsupportedSchemaVersion {
        declared,
        highest: CURRENT_VERSION,
    }
}

/// Apply every registered upgrade in `(from, to]`, ascending.
///
/// Idempotent: each step's `needs_to_run` guard skips records already in
/// that version's shape, so calling this twice produces no further
/// change. `from == to` is a no-op.
pub fn upgrade_in_place(record: &mut RecordMap, from: u32, to: u32) -> Result<()> {
    if to > CURRENT_VERSION {
        return Err(unsupported(to as i64));
    }
    for version in (from + 1)..=to {
        let step = step_for(version).ok_or_else(|| unsupported(version as i64))?;
        if (step.needs_to_run)(record) {
            tracing::debug!(version, "applying schema upgrade");
            (step.upgrade)(record)?;
        }
    }
    Ok(())
}

/// Normalize an imported record declared at `declared` and bring it to
/// the current schema shape.
///
/// The declared version's `import_transform` repairs scalar encodings;
/// the `upgrade` chain above it performs structural evolution. A
/// declared version outside the registry (newer than supported, older
/// than the oldest path, or negative) is rejected with
/// `UnsupportedSchemaVersion` without touching the record.
pub fn import_from_version(record: &mut RecordMap, declared: i64) -> Result<()> {
    let declared_version =
        u32::try_from(declared).map_err(|_| unsupported(declared))?;
    if !(OLDEST_SUPPORTED_VERSION..=CURRENT_VERSION).contains(&declared_version) {
        return Err(unsupported(declared));
    }
    let step = step_for(declared_version).ok_or_else(|| unsupported(declared))?;
    (step.import_transform)(record)?;
    upgrade_in_place(record, declared_version, CURRENT_VERSION)
}

fn never_runs(_record: &RecordMap) -> bool {
    false
}

fn upgrade_noop(_record: &mut RecordMap) -> Result<()> {
    Ok(())
}

fn v4_needs_to_run(record: &RecordMap) -> bool {
    !record.contains_key("editLog")
}

/// v4: synthesize `editLog` from the legacy bookkeeping fields, then
/// delete them.
///
/// One creation event is always produced; an update event is added only
/// when `updated` differs materially from `created`.
fn v4_upgrade(record: &mut RecordMap) -> Result<()> {
    let created = record.get("created").and_then(parse_timestamp);
    let updated = record.get("updated").and_then(parse_timestamp);
    let created_by = string_field(record, "createdBy").unwrap_or_else(|| "unknown".to_string());
    let last_updated_by = string_field(record, "lastUpdatedBy");

    // Legacy records without a created timestamp fall back to the entry
    // date at midnight UTC; the edit log must never be empty.
    let creation_time = created
        .or(updated)
        .or_else(|| fallback_creation_time(record))
        .unwrap_or_else(Utc::now);

    let mut events = vec![edit_event(creation_time, &created_by)];
    if let (Some(created), Some(updated)) = (created, updated) {
        if updated != created {
            let tool = last_updated_by.unwrap_or(created_by);
            events.push(edit_event(updated, &tool));
        }
    }

    record.insert("editLog".to_string(), Value::Array(events));
    record.remove("created");
    record.remove("updated");
    record.remove("createdBy");
    record.remove("lastUpdatedBy");
    Ok(())
}

/// Shared `import_transform`: re-encode date and timestamp scalars into
/// the canonical string forms the typed model deserializes from.
///
/// Exports produced by older builds carry epoch-millisecond numbers and
/// full datetime strings where the model expects `YYYY-MM-DD` dates and
/// RFC 3339 timestamps.
fn normalize_scalars(record: &mut RecordMap) -> Result<()> {
    if let Some(value) = record.get_mut("date") {
        *value = Value::String(normalize_date(value)?);
    }
    for field in ["created", "updated"] {
        if let Some(value) = record.get_mut(field) {
            if let Some(ts) = parse_timestamp(value) {
                *value = Value::String(ts.to_rfc3339());
            }
        }
    }
    if let Some(Value::Array(events)) = record.get_mut("editLog") {
        for event in events.iter_mut() {
            let Some(map) = event.as_object_mut() else {
                return Err(DaybookError::Validation(
                    "editLog event is not an object".to_string(),
                ));
            };
            if let Some(value) = map.get_mut("timestamp") {
                let ts = parse_timestamp(value).ok_or_else(|| {
                    DaybookError::Validation(format!("Unparseable editLog timestamp: {}", value))
                })?;
                *value = Value::String(ts.to_rfc3339());
            }
        }
    }
    Ok(())
}

fn normalize_date(value: &Value) -> Result<String> {
    match value {
        // Full datetime strings keep only the calendar date part.
        Value::String(s) => Ok(s.split('T').next().unwrap_or(s).trim().to_string()),
        Value::Number(_) => {
            let ts = parse_timestamp(value).ok_or_else(|| {
                DaybookError::Validation(format!("Unparseable date value: {}", value))
            })?;
            Ok(ts.date_naive().to_string())
        }
        other => Err(DaybookError::Validation(format!(
            "Unparseable date value: {}",
            other
        ))),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn string_field(record: &RecordMap, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn fallback_creation_time(record: &RecordMap) -> Option<DateTime<Utc>> {
    let date = record.get("date")?.as_str()?;
    let date: chrono::NaiveDate = date.parse().ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

fn edit_event(timestamp: DateTime<Utc>, editing_tool: &str) -> Value {
    serde_json::json!({
        "timestamp": timestamp.to_rfc3339(),
        "durationMs": 0,
        "editingTool": editing_tool,
    })
}

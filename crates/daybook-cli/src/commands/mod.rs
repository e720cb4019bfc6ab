//! Command handlers, one module per command family.

pub mod catalog;
pub mod entries;
pub mod stats;
pub mod transfer;

use chrono::{Local, NaiveDate};
use daybook_core::{Database, Journal, Mood};
use uuid::Uuid;

use crate::Cli;

/// Open the configured journal database and load the entry collection.
pub fn load_journal(cli: &Cli) -> anyhow::Result<Journal> {
    let path = cli.journal_path()?;
    if !path.exists() {
        anyhow::bail!(
            "No journal found at {}. Run `daybook init` to create one.",
            path.display()
        );
    }
    let db = Database::open(&path)?;
    Ok(Journal::load(db)?)
}

/// Parse a YYYY-MM-DD date argument, defaulting to today.
pub fn parse_date(value: Option<&str>) -> anyhow::Result<NaiveDate> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid date \"{}\": {}", raw, e)),
        None => Ok(Local::now().date_naive()),
    }
}

pub fn parse_uuid(value: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| anyhow::anyhow!("Invalid ID \"{}\": {}", value, e))
}

/// Resolve a mood by (case-insensitive) name.
pub fn resolve_mood(journal: &Journal, name: &str) -> anyhow::Result<Mood> {
    journal
        .moods()?
        .into_iter()
        .find(|mood| mood.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Mood \"{}\" not found. Run `daybook mood list` to see moods.",
                name
            )
        })
}

//! Output formatting helpers for the CLI.

use std::collections::HashMap;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use daybook_core::{ActivityDetail, Entry, Journal, Mood};
use owo_colors::OwoColorize;
use uuid::Uuid;

/// Build a map of mood id -> display label.
pub fn mood_label_map(journal: &Journal) -> anyhow::Result<HashMap<Uuid, String>> {
    let mut map = HashMap::new();
    for mood in journal.moods()? {
        map.insert(mood.id, format!("{} {}", mood.emoji, mood.name));
    }
    Ok(map)
}

/// Short one-line summary of an entry's activities.
pub fn activities_summary(entry: &Entry) -> String {
    entry
        .activities
        .iter()
        .map(|(activity, detail)| match detail {
            ActivityDetail::Count(n) => format!("{}={}", activity, n),
            ActivityDetail::List(items) => format!("{}[{}]", activity, items.len()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert an entry to JSON for output.
pub fn entry_json(entry: &Entry, mood_labels: &HashMap<Uuid, String>) -> serde_json::Value {
    let mood_label = entry.mood.and_then(|id| mood_labels.get(&id).cloned());
    serde_json::json!({
        "id": entry.id,
        "date": entry.date,
        "mood": entry.mood,
        "moodLabel": mood_label,
        "note": entry.note,
        "activities": entry.activities,
        "editLog": entry.edit_log,
    })
}

/// Render entries as a table, newest first.
pub fn entries_table(entries: &[&Entry], mood_labels: &HashMap<Uuid, String>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Date", "Mood", "Activities", "Note", "ID"]);
    for entry in entries {
        let mood = entry
            .mood
            .and_then(|id| mood_labels.get(&id).cloned())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            entry.date.to_string(),
            mood,
            activities_summary(entry),
            truncate(&entry.note, 40),
            entry.id.to_string(),
        ]);
    }
    table
}

/// Print a single entry in human-readable format.
pub fn print_entry(entry: &Entry, mood_labels: &HashMap<Uuid, String>, quiet: bool) {
    if !quiet {
        println!("{} {}", "Entry".bold(), entry.id);
        println!("Date: {}", entry.date);
        if let Some(mood) = entry.mood {
            let label = mood_labels
                .get(&mood)
                .cloned()
                .unwrap_or_else(|| mood.to_string());
            println!("Mood: {}", label);
        }
        for (activity, detail) in &entry.activities {
            match detail {
                ActivityDetail::Count(n) => println!("  {}: {}", activity, n),
                ActivityDetail::List(items) => println!("  {}: {}", activity, items.join(", ")),
            }
        }
        if let Some(created) = entry.created_at() {
            println!(
                "Created: {} ({} edits)",
                created.to_rfc3339(),
                entry.edit_log.len().saturating_sub(1)
            );
        }
        if !entry.note.is_empty() {
            println!();
        }
    }
    if !entry.note.is_empty() {
        println!("{}", entry.note);
    }
}

pub fn mood_line(mood: &Mood) -> String {
    format!("{} {} (rating {})", mood.emoji, mood.name, mood.rating)
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

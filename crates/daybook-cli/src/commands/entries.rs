use std::collections::BTreeMap;

use chrono::NaiveDate;
use daybook_core::{ActivityDetail, Database, EntryDraft};

use crate::commands::{load_journal, parse_date, parse_uuid, resolve_mood};
use crate::config;
use crate::output::{entries_table, entry_json, mood_label_map, print_entry};
use crate::{Cli, EDITING_TOOL};

pub fn handle_init(cli: &Cli, path_arg: Option<&str>) -> anyhow::Result<()> {
    let path = match path_arg {
        Some(path) => std::path::PathBuf::from(path),
        None => cli.journal_path()?,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::create(&path)?;

    let config_path = config::default_config_path()?;
    if !config_path.exists() {
        config::write_config(&config_path, &config::DaybookConfig::new(path.clone()))?;
    }

    if !cli.quiet {
        println!("Created journal at {}", path.display());
        println!("Device ID: {}", db.device_id());
    }
    Ok(())
}

/// Parse repeated NAME=VALUE detail flags into an activities map.
fn parse_details(count: &[String], item: &[String]) -> anyhow::Result<BTreeMap<String, ActivityDetail>> {
    let mut activities: BTreeMap<String, ActivityDetail> = BTreeMap::new();

    for raw in count {
        let (name, amount) = raw
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected NAME=AMOUNT, got \"{}\"", raw))?;
        let amount: f64 = amount
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid amount in \"{}\": {}", raw, e))?;
        if activities.contains_key(name) {
            anyhow::bail!("Duplicate detail for activity \"{}\"", name);
        }
        activities.insert(name.to_string(), ActivityDetail::Count(amount));
    }

    for raw in item {
        let (name, text) = raw
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected NAME=TEXT, got \"{}\"", raw))?;
        match activities.get_mut(name) {
            None => {
                activities.insert(
                    name.to_string(),
                    ActivityDetail::List(vec![text.to_string()]),
                );
            }
            Some(ActivityDetail::List(items)) => items.push(text.to_string()),
            Some(ActivityDetail::Count(_)) => {
                anyhow::bail!(
                    "Activity \"{}\" already has a numeric detail; it cannot also hold items",
                    name
                );
            }
        }
    }

    Ok(activities)
}

pub fn handle_add(
    cli: &Cli,
    date: Option<&str>,
    mood: Option<&str>,
    note: Option<&str>,
    count: &[String],
    item: &[String],
) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;

    let mut draft = EntryDraft::new(parse_date(date)?);
    if let Some(name) = mood {
        draft = draft.with_mood(resolve_mood(&journal, name)?.id);
    }
    if let Some(note) = note {
        draft = draft.with_note(note);
    }
    let activities = parse_details(count, item)?;
    if !activities.is_empty() {
        draft = draft.with_activities(activities);
    }

    let entry = journal.insert(draft, EDITING_TOOL)?;
    if !cli.quiet {
        println!("Added entry {} for {}", entry.id, entry.date);
    }
    Ok(())
}

pub fn handle_list(
    cli: &Cli,
    since: Option<&str>,
    until: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;

    let since: Option<NaiveDate> = since.map(|raw| parse_date(Some(raw))).transpose()?;
    let until: Option<NaiveDate> = until.map(|raw| parse_date(Some(raw))).transpose()?;

    let entries: Vec<_> = journal
        .entries()
        .iter()
        .filter(|entry| since.map_or(true, |date| entry.date >= date))
        .filter(|entry| until.map_or(true, |date| entry.date <= date))
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    let mood_labels = mood_label_map(&journal)?;
    if json {
        let values: Vec<_> = entries
            .iter()
            .map(|entry| entry_json(entry, &mood_labels))
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else if entries.is_empty() {
        if !cli.quiet {
            println!("No entries.");
        }
    } else {
        println!("{}", entries_table(&entries, &mood_labels));
    }
    Ok(())
}

pub fn handle_show(cli: &Cli, id: &str, json: bool) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let id = parse_uuid(id)?;
    let entry = journal
        .get_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("Entry {} not found", id))?;

    let mood_labels = mood_label_map(&journal)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entry_json(entry, &mood_labels))?
        );
    } else {
        print_entry(entry, &mood_labels, cli.quiet);
    }
    Ok(())
}

pub fn handle_edit(
    cli: &Cli,
    id: &str,
    date: Option<&str>,
    mood: Option<&str>,
    note: Option<&str>,
    duration_ms: u64,
) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    let id = parse_uuid(id)?;
    let existing = journal
        .get_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("Entry {} not found", id))?;

    let mut draft = EntryDraft::new(match date {
        Some(raw) => parse_date(Some(raw))?,
        None => existing.date,
    })
    .with_id(id);
    if let Some(name) = mood {
        draft = draft.with_mood(resolve_mood(&journal, name)?.id);
    }
    if let Some(note) = note {
        draft = draft.with_note(note);
    }

    let entry = journal.upsert(draft, duration_ms, EDITING_TOOL)?;
    if !cli.quiet {
        println!("Edited entry {}", entry.id);
    }
    Ok(())
}

pub fn handle_remove(cli: &Cli, id: &str) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    let id = parse_uuid(id)?;
    let removed = journal.remove(id)?;
    if !cli.quiet {
        if removed {
            println!("Removed entry {}", id);
        } else {
            println!("Entry {} not found; nothing removed", id);
        }
    }
    Ok(())
}

pub fn handle_detail_add_count(cli: &Cli, id: &str, activity: &str, amount: f64) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    journal.add_to_numeric(parse_uuid(id)?, activity, amount)?;
    if !cli.quiet {
        println!("Updated {}", activity);
    }
    Ok(())
}

pub fn handle_detail_add_item(cli: &Cli, id: &str, activity: &str, text: &str) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    journal.add_to_list(parse_uuid(id)?, activity, text)?;
    if !cli.quiet {
        println!("Updated {}", activity);
    }
    Ok(())
}

pub fn handle_detail_set_item(
    cli: &Cli,
    id: &str,
    activity: &str,
    index: usize,
    text: &str,
) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    journal.update_list_item(parse_uuid(id)?, activity, index, text)?;
    if !cli.quiet {
        println!("Updated {}[{}]", activity, index);
    }
    Ok(())
}

pub fn handle_detail_remove_item(cli: &Cli, id: &str, activity: &str, index: usize) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    journal.remove_list_item(parse_uuid(id)?, activity, index)?;
    if !cli.quiet {
        println!("Removed {}[{}]", activity, index);
    }
    Ok(())
}

pub fn handle_detail_clear(cli: &Cli, id: &str, activity: &str) -> anyhow::Result<()> {
    let mut journal = load_journal(cli)?;
    journal.clear_detail(parse_uuid(id)?, activity)?;
    if !cli.quiet {
        println!("Cleared {}", activity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_details() {
        let activities = parse_details(
            &["pushups=25".to_string()],
            &["coffee=espresso".to_string(), "coffee=filter".to_string()],
        )
        .unwrap();
        assert_eq!(activities["pushups"], ActivityDetail::Count(25.0));
        assert_eq!(
            activities["coffee"],
            ActivityDetail::List(vec!["espresso".to_string(), "filter".to_string()])
        );
    }

    #[test]
    fn test_parse_details_rejects_mixed_kinds() {
        let result = parse_details(
            &["coffee=2".to_string()],
            &["coffee=espresso".to_string()],
        );
        assert!(result.is_err());
    }
}

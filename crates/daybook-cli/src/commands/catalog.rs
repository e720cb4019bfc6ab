use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use crate::commands::{load_journal, parse_date, parse_uuid};
use crate::output::mood_line;
use crate::{Cli, EDITING_TOOL};

pub fn handle_mood_add(cli: &Cli, name: &str, emoji: &str, rating: u8) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let mood = journal.add_mood(name, emoji, rating)?;
    if !cli.quiet {
        println!("Added mood {} ({})", mood_line(&mood), mood.id);
    }
    Ok(())
}

pub fn handle_mood_list(cli: &Cli) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let mut moods = journal.moods()?;
    moods.sort_by(|a, b| b.rating.cmp(&a.rating));

    if moods.is_empty() {
        if !cli.quiet {
            println!("No moods. Add one with `daybook mood add`.");
        }
        return Ok(());
    }
    for mood in &moods {
        println!("{}  {}", mood.id, mood_line(mood));
    }
    Ok(())
}

pub fn handle_activity_add(
    cli: &Cli,
    name: &str,
    emoji: &str,
    category: Option<String>,
) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let activity = journal.add_activity(name, emoji, category)?;
    if !cli.quiet {
        println!("Added activity {} {} ({})", activity.emoji, activity.name, activity.id);
    }
    Ok(())
}

pub fn handle_activity_list(cli: &Cli, include_archived: bool) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let activities = journal.activities(include_archived)?;

    if activities.is_empty() {
        if !cli.quiet {
            println!("No activities. Add one with `daybook activity add`.");
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Activity", "Category", "Archived", "ID"]);
    for activity in &activities {
        table.add_row(vec![
            format!("{} {}", activity.emoji, activity.name),
            activity.category.clone().unwrap_or_else(|| "-".to_string()),
            if activity.is_archived { "yes" } else { "" }.to_string(),
            activity.id.to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn handle_activity_archive(cli: &Cli, id: &str, archived: bool) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let activity = journal.set_activity_archived(parse_uuid(id)?, archived)?;
    if !cli.quiet {
        if archived {
            println!("Archived {}; it stays in history and stats", activity.name);
        } else {
            println!("Restored {}", activity.name);
        }
    }
    Ok(())
}

pub fn handle_note_add(cli: &Cli, content: &str, date: Option<&str>) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let note = journal.add_note(parse_date(date)?, content, EDITING_TOOL)?;
    if !cli.quiet {
        if note.path.is_empty() {
            println!("Added note {}", note.id);
        } else {
            println!("Added note {} under #{}", note.id, note.path);
        }
    }
    Ok(())
}

pub fn handle_note_list(cli: &Cli, path: Option<&str>) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;
    let mut notes = journal.notes()?;
    if let Some(path) = path {
        notes.retain(|note| note.path == path);
    }
    notes.sort_by(|a, b| b.date.cmp(&a.date));

    if notes.is_empty() {
        if !cli.quiet {
            println!("No notes.");
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Date", "Path", "Content", "ID"]);
    for note in &notes {
        table.add_row(vec![
            note.date.to_string(),
            note.path.clone(),
            crate::output::truncate(&note.content, 48),
            note.id.to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use daybook_core::stats::{
    activity_detail_stats, period_stats, run_summaries, ActivityTotalsSummarizer,
    DateRangeSummarizer, EntryCountSummarizer, MoodDistributionSummarizer, Summarizer,
};
use owo_colors::OwoColorize;

use crate::commands::load_journal;
use crate::Cli;

pub fn handle_stats(
    cli: &Cli,
    activity: Option<&str>,
    top: usize,
    exclude: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let journal = load_journal(cli)?;

    match activity {
        Some(activity) => handle_activity_rankings(&journal, activity, top, exclude, json),
        None => handle_period_overview(cli, &journal, json),
    }
}

/// MFU/MRU rankings for one activity's detail vocabulary.
fn handle_activity_rankings(
    journal: &daybook_core::Journal,
    activity: &str,
    top: usize,
    exclude: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let rankings = activity_detail_stats(
        journal.entries(),
        activity,
        |detail| !exclude.contains(&detail.text),
        top,
    );

    if json {
        let as_json = |details: &[daybook_core::stats::StatsDetailEntry]| {
            details
                .iter()
                .map(|detail| {
                    serde_json::json!({
                        "text": detail.text,
                        "count": detail.count,
                        "lastUsed": detail.dates.first().map(|d| d.date),
                    })
                })
                .collect::<Vec<_>>()
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "activity": activity,
                "mfu": as_json(&rankings.mfu),
                "mru": as_json(&rankings.mru),
            }))?
        );
        return Ok(());
    }

    if rankings.mfu.is_empty() {
        println!("No recorded details for \"{}\".", activity);
        return Ok(());
    }

    println!("{} {}", "Most used:".bold(), activity);
    for detail in &rankings.mfu {
        println!("  {:>4}×  {}", detail.count, detail.text);
    }
    println!("{} {}", "Most recent:".bold(), activity);
    for detail in &rankings.mru {
        let last = detail
            .dates
            .first()
            .map(|d| d.date.to_string())
            .unwrap_or_default();
        println!("  {}  {}", last, detail.text);
    }
    Ok(())
}

/// Whole-journal overview: per-activity table plus one-pass summaries.
fn handle_period_overview(
    cli: &Cli,
    journal: &daybook_core::Journal,
    json: bool,
) -> anyhow::Result<()> {
    let stats = period_stats(journal.entries());

    let mut summarizers: Vec<Box<dyn Summarizer>> = vec![
        Box::new(EntryCountSummarizer::default()),
        Box::new(MoodDistributionSummarizer::default()),
        Box::new(ActivityTotalsSummarizer::default()),
        Box::new(DateRangeSummarizer::default()),
    ];
    let summaries = run_summaries(journal.entries(), &mut summarizers);

    if json {
        let activities: serde_json::Map<String, serde_json::Value> = stats
            .iter()
            .map(|(activity, entry)| {
                (
                    activity.clone(),
                    serde_json::json!({
                        "entryCount": entry.entry_count,
                        "detailOccurrences": entry.detail_occurrences,
                        "lastUsed": entry.dates.first().map(|d| d.date),
                        "distinctDetails": entry.details_used.len(),
                    }),
                )
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "activities": activities,
                "summaries": summaries,
            }))?
        );
        return Ok(());
    }

    if stats.is_empty() {
        if !cli.quiet {
            println!("No activity has been recorded yet.");
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Activity", "Entries", "Items", "Last used"]);
    for (activity, entry) in &stats {
        table.add_row(vec![
            activity.clone(),
            entry.entry_count.to_string(),
            entry.detail_occurrences.to_string(),
            entry
                .dates
                .first()
                .map(|d| d.date.to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    if let Some(range) = summaries.get("dateRange") {
        if !range.is_null() {
            println!(
                "{} entries from {} to {}",
                summaries["entryCount"],
                range["first"].as_str().unwrap_or("?"),
                range["last"].as_str().unwrap_or("?"),
            );
        }
    }
    Ok(())
}

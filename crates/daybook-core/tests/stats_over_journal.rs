//! Stats derived from a live journal: memoization against the
//! revision counter and the UI-facing query surface.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use daybook_core::stats::{
    activity_detail_stats, ActivityTotalsSummarizer, DateRangeSummarizer,
    EntryCountSummarizer, StatsCache, Summarizer, run_summaries,
};
use daybook_core::{ActivityDetail, Database, EntryDraft, Journal};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn temp_journal(dir: &TempDir) -> Journal {
    let db = Database::create(&dir.path().join("journal.daybook")).unwrap();
    Journal::load(db).unwrap()
}

fn insert_with_list(journal: &mut Journal, day: &str, activity: &str, items: &[&str]) {
    let mut activities = BTreeMap::new();
    activities.insert(
        activity.to_string(),
        ActivityDetail::List(items.iter().map(|s| s.to_string()).collect()),
    );
    journal
        .insert(EntryDraft::new(date(day)).with_activities(activities), "test")
        .unwrap();
}

#[test]
fn test_cache_reuses_until_revision_changes() {
    let dir = TempDir::new().unwrap();
    let mut journal = temp_journal(&dir);
    insert_with_list(&mut journal, "2024-01-01", "coffee", &["espresso"]);

    let mut cache = StatsCache::new();
    let first = cache.period_stats(&journal);
    let second = cache.period_stats(&journal);
    assert!(Arc::ptr_eq(&first, &second));

    insert_with_list(&mut journal, "2024-01-02", "coffee", &["filter"]);
    let third = cache.period_stats(&journal);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third["coffee"].entry_count, 2);
}

#[test]
fn test_detail_rankings_over_journal() {
    let dir = TempDir::new().unwrap();
    let mut journal = temp_journal(&dir);
    insert_with_list(&mut journal, "2024-01-01", "coffee", &["espresso"]);
    insert_with_list(&mut journal, "2024-01-02", "coffee", &["espresso", "filter"]);
    insert_with_list(&mut journal, "2024-01-03", "coffee", &["filter"]);

    // Exclude values already selected on the entry being edited: the
    // filter the UI layer passes.
    let selected = ["filter"];
    let rankings = activity_detail_stats(
        journal.entries(),
        "coffee",
        |detail| !selected.contains(&detail.text.as_str()),
        7,
    );

    assert_eq!(rankings.mfu.len(), 1);
    assert_eq!(rankings.mfu[0].text, "espresso");
    assert_eq!(rankings.mfu[0].count, 2);
    assert_eq!(rankings.mru[0].dates[0].date, date("2024-01-02"));
}

#[test]
fn test_summaries_over_entry_subset() {
    let dir = TempDir::new().unwrap();
    let mut journal = temp_journal(&dir);
    insert_with_list(&mut journal, "2024-01-01", "coffee", &["espresso"]);
    insert_with_list(&mut journal, "2024-01-05", "walk", &[]);

    // Period reports run over a caller-chosen subset; here, everything.
    let mut summarizers: Vec<Box<dyn Summarizer>> = vec![
        Box::new(EntryCountSummarizer::default()),
        Box::new(ActivityTotalsSummarizer::default()),
        Box::new(DateRangeSummarizer::default()),
    ];
    let values = run_summaries(journal.entries(), &mut summarizers);

    assert_eq!(values["entryCount"], serde_json::json!(2));
    assert_eq!(values["activityTotals"]["coffee"], serde_json::json!(1));
    assert_eq!(values["dateRange"]["first"], serde_json::json!("2024-01-01"));
    assert_eq!(values["dateRange"]["last"], serde_json::json!("2024-01-05"));
}

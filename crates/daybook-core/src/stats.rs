//! Single-pass statistics over the entry collection.
//!
//! All aggregates are pure functions of the entries they are handed:
//! same collection in, same stats out, nothing carried over between
//! invocations, nothing persisted. Derived values hold id-based
//! back-references into the collection, never owned entries, and maps
//! are BTreeMaps so output order is deterministic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DaybookError, Result};
use crate::journal::Journal;
use crate::model::{ActivityDetail, Entry};

/// Top-N cutoff used by the detail-ranking convenience surface.
pub const DEFAULT_DETAIL_LIMIT: usize = 7;

/// Non-owning back-reference to one entry occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedRef {
    pub date: NaiveDate,
    pub entry_id: Uuid,
}

/// Per-activity statistics derived from the entry collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsActivityEntry {
    /// Number of entries where the activity appears: once per entry,
    /// regardless of detail kind or list length.
    pub entry_count: u64,

    /// Total list elements recorded across those entries. Kept separate
    /// from `entry_count`; the two measure different things.
    pub detail_occurrences: u64,

    /// Occurrence references, newest date first.
    pub dates: Vec<DatedRef>,

    /// Detail text -> per-text statistics. Only list-typed details
    /// contribute; numeric activities have no enumerable detail
    /// vocabulary.
    pub details_used: BTreeMap<String, StatsDetailEntry>,
}

/// Statistics for one recorded detail text value.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsDetailEntry {
    pub text: String,
    pub count: u64,
    /// Occurrence references, newest date first. `dates[0]` is the
    /// value's most recent use; the MRU ranking depends on it.
    pub dates: Vec<DatedRef>,
}

/// Aggregate the full entry collection in one pass.
pub fn period_stats(entries: &[Entry]) -> BTreeMap<String, StatsActivityEntry> {
    let mut stats: BTreeMap<String, StatsActivityEntry> = BTreeMap::new();

    for entry in entries {
        for (activity_id, detail) in &entry.activities {
            let slot = stats.entry(activity_id.clone()).or_default();
            slot.entry_count += 1;
            slot.dates.push(DatedRef {
                date: entry.date,
                entry_id: entry.id,
            });

            if let ActivityDetail::List(items) = detail {
                slot.detail_occurrences += items.len() as u64;
                for text in items {
                    let detail_slot = slot
                        .details_used
                        .entry(text.clone())
                        .or_insert_with(|| StatsDetailEntry {
                            text: text.clone(),
                            count: 0,
                            dates: Vec::new(),
                        });
                    detail_slot.count += 1;
                    detail_slot.dates.push(DatedRef {
                        date: entry.date,
                        entry_id: entry.id,
                    });
                }
            }
        }
    }

    for activity in stats.values_mut() {
        sort_newest_first(&mut activity.dates);
        for detail in activity.details_used.values_mut() {
            sort_newest_first(&mut detail.dates);
        }
    }
    stats
}

fn sort_newest_first(dates: &mut [DatedRef]) {
    dates.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Most-frequently-used and most-recently-used rankings for one
/// activity's detail vocabulary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailRankings {
    pub mfu: Vec<StatsDetailEntry>,
    pub mru: Vec<StatsDetailEntry>,
}

/// Rank an activity's recorded detail values.
///
/// The filter runs before truncation, so slots dropped by the filter
/// are backfilled from beyond the top `limit`. MFU orders by count
/// descending; MRU orders by most recent occurrence date descending,
/// tie-broken by count descending.
pub fn activity_detail_stats(
    entries: &[Entry],
    activity_id: &str,
    filter: impl Fn(&StatsDetailEntry) -> bool,
    limit: usize,
) -> DetailRankings {
    let mut details: BTreeMap<String, StatsDetailEntry> = BTreeMap::new();

    for entry in entries {
        let Some(ActivityDetail::List(items)) = entry.activities.get(activity_id) else {
            continue;
        };
        for text in items {
            let slot = details
                .entry(text.clone())
                .or_insert_with(|| StatsDetailEntry {
                    text: text.clone(),
                    count: 0,
                    dates: Vec::new(),
                });
            slot.count += 1;
            slot.dates.push(DatedRef {
                date: entry.date,
                entry_id: entry.id,
            });
        }
    }

    let mut kept: Vec<StatsDetailEntry> = details
        .into_values()
        .map(|mut detail| {
            sort_newest_first(&mut detail.dates);
            detail
        })
        .filter(|detail| filter(detail))
        .collect();

    let mut mfu = kept.clone();
    mfu.sort_by(|a, b| b.count.cmp(&a.count));
    mfu.truncate(limit);

    kept.sort_by(|a, b| {
        let a_latest = a.dates.first().map(|d| d.date);
        let b_latest = b.dates.first().map(|d| d.date);
        b_latest
            .cmp(&a_latest)
            .then_with(|| b.count.cmp(&a.count))
    });
    kept.truncate(limit);

    DetailRankings { mfu, mru: kept }
}

/// An independent single-pass aggregate composed with others into one
/// traversal of the entry collection.
pub trait Summarizer {
    /// Stable identifier keying this summarizer's value in the result
    /// map.
    fn id(&self) -> &str;

    /// Fold one entry into the running state. An error here is caught
    /// and logged by the runner; it skips this entry for this
    /// summarizer only.
    fn accumulate(&mut self, entry: &Entry) -> anyhow::Result<()>;

    /// Produce the final value.
    fn finalize(&mut self) -> Value;
}

/// Run every summarizer over the entry subset in one traversal.
///
/// A summarizer failing on one entry does not abort the traversal or
/// the other summarizers; its state simply excludes that entry.
pub fn run_summaries(
    entries: &[Entry],
    summarizers: &mut [Box<dyn Summarizer>],
) -> BTreeMap<String, Value> {
    for entry in entries {
        accumulate_all(summarizers, entry);
    }
    finalize_all(summarizers)
}

/// [`run_summaries`] with a cooperative cancellation flag, checked
/// between entries. Cancellation discards partial results.
pub fn run_summaries_cancellable(
    entries: &[Entry],
    summarizers: &mut [Box<dyn Summarizer>],
    cancel: &AtomicBool,
) -> Result<BTreeMap<String, Value>> {
    for entry in entries {
        if cancel.load(Ordering::Relaxed) {
            return Err(DaybookError::Cancelled);
        }
        accumulate_all(summarizers, entry);
    }
    Ok(finalize_all(summarizers))
}

fn accumulate_all(summarizers: &mut [Box<dyn Summarizer>], entry: &Entry) {
    for summarizer in summarizers.iter_mut() {
        if let Err(error) = summarizer.accumulate(entry) {
            tracing::warn!(
                summarizer = summarizer.id(),
                entry = %entry.id,
                %error,
                "summarizer failed for entry; skipping"
            );
        }
    }
}

fn finalize_all(summarizers: &mut [Box<dyn Summarizer>]) -> BTreeMap<String, Value> {
    summarizers
        .iter_mut()
        .map(|summarizer| (summarizer.id().to_string(), summarizer.finalize()))
        .collect()
}

/// Memoizes [`period_stats`] against the journal's revision counter, so
/// repeated reads between mutations reuse one computation.
#[derive(Default)]
pub struct StatsCache {
    cached: Option<(u64, Arc<BTreeMap<String, StatsActivityEntry>>)>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period_stats(&mut self, journal: &Journal) -> Arc<BTreeMap<String, StatsActivityEntry>> {
        if let Some((revision, stats)) = &self.cached {
            if *revision == journal.revision() {
                return Arc::clone(stats);
            }
        }
        let stats = Arc::new(period_stats(journal.entries()));
        self.cached = Some((journal.revision(), Arc::clone(&stats)));
        stats
    }
}

// --- Built-in summarizers used by the reporting surface ---

/// Counts entries in the period.
#[derive(Default)]
pub struct EntryCountSummarizer {
    count: u64,
}

impl Summarizer for EntryCountSummarizer {
    fn id(&self) -> &str {
        "entryCount"
    }

    fn accumulate(&mut self, _entry: &Entry) -> anyhow::Result<()> {
        self.count += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Value {
        Value::from(self.count)
    }
}

/// Counts entries per mood id; entries with no mood land under
/// `"unset"`.
#[derive(Default)]
pub struct MoodDistributionSummarizer {
    counts: BTreeMap<String, u64>,
}

impl Summarizer for MoodDistributionSummarizer {
    fn id(&self) -> &str {
        "moodDistribution"
    }

    fn accumulate(&mut self, entry: &Entry) -> anyhow::Result<()> {
        let key = entry
            .mood
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unset".to_string());
        *self.counts.entry(key).or_default() += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Value {
        Value::Object(
            self.counts
                .iter()
                .map(|(mood, count)| (mood.clone(), Value::from(*count)))
                .collect(),
        )
    }
}

/// Counts entries per activity id.
#[derive(Default)]
pub struct ActivityTotalsSummarizer {
    counts: BTreeMap<String, u64>,
}

impl Summarizer for ActivityTotalsSummarizer {
    fn id(&self) -> &str {
        "activityTotals"
    }

    fn accumulate(&mut self, entry: &Entry) -> anyhow::Result<()> {
        for activity_id in entry.activities.keys() {
            *self.counts.entry(activity_id.clone()).or_default() += 1;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Value {
        Value::Object(
            self.counts
                .iter()
                .map(|(activity, count)| (activity.clone(), Value::from(*count)))
                .collect(),
        )
    }
}

/// Tracks the oldest and newest entry dates seen.
#[derive(Default)]
pub struct DateRangeSummarizer {
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

impl Summarizer for DateRangeSummarizer {
    fn id(&self) -> &str {
        "dateRange"
    }

    fn accumulate(&mut self, entry: &Entry) -> anyhow::Result<()> {
        self.first = Some(self.first.map_or(entry.date, |d| d.min(entry.date)));
        self.last = Some(self.last.map_or(entry.date, |d| d.max(entry.date)));
        Ok(())
    }

    fn finalize(&mut self) -> Value {
        match (self.first, self.last) {
            (Some(first), Some(last)) => serde_json::json!({
                "first": first.to_string(),
                "last": last.to_string(),
            }),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn entry_with_list(day: &str, activity: &str, items: &[&str]) -> Entry {
        let mut entry = Entry::new(date(day), "test");
        entry.activities.insert(
            activity.to_string(),
            ActivityDetail::List(items.iter().map(|s| s.to_string()).collect()),
        );
        entry
    }

    fn entry_with_count(day: &str, activity: &str, amount: f64) -> Entry {
        let mut entry = Entry::new(date(day), "test");
        entry
            .activities
            .insert(activity.to_string(), ActivityDetail::Count(amount));
        entry
    }

    #[test]
    fn test_period_stats_counts() {
        let entries = vec![
            entry_with_list("2024-01-01", "a", &["x"]),
            entry_with_list("2024-01-02", "a", &["x", "y"]),
            entry_with_count("2024-01-03", "b", 5.0),
        ];

        let stats = period_stats(&entries);

        let a = &stats["a"];
        assert_eq!(a.entry_count, 2);
        assert_eq!(a.detail_occurrences, 3);
        assert_eq!(a.details_used["x"].count, 2);
        assert_eq!(a.details_used["y"].count, 1);
        assert_eq!(a.dates[0].date, date("2024-01-02"));

        // Numeric details count the entry but enumerate no vocabulary.
        let b = &stats["b"];
        assert_eq!(b.entry_count, 1);
        assert_eq!(b.detail_occurrences, 0);
        assert!(b.details_used.is_empty());
    }

    #[test]
    fn test_stats_are_pure() {
        let entries = vec![
            entry_with_list("2024-01-01", "a", &["x"]),
            entry_with_list("2024-01-02", "a", &["x", "y"]),
        ];
        let copy = entries.clone();

        assert_eq!(period_stats(&entries), period_stats(&entries));
        assert_eq!(period_stats(&entries), period_stats(&copy));
    }

    #[test]
    fn test_mru_distinguishes_from_mfu() {
        // x used twice (latest 01-02); y used twice (latest 01-03).
        let entries = vec![
            entry_with_list("2024-01-01", "a", &["x"]),
            entry_with_list("2024-01-02", "a", &["x", "y"]),
            entry_with_list("2024-01-03", "a", &["y"]),
        ];

        let rankings = activity_detail_stats(&entries, "a", |_| true, DEFAULT_DETAIL_LIMIT);

        // MFU: counts tied at 2; either order is acceptable.
        let mfu_counts: Vec<u64> = rankings.mfu.iter().map(|d| d.count).collect();
        assert_eq!(mfu_counts, vec![2, 2]);

        // MRU: y's latest date wins.
        let mru_texts: Vec<&str> = rankings.mru.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(mru_texts, vec!["y", "x"]);
    }

    #[test]
    fn test_mru_same_date_ties_break_by_count() {
        let entries = vec![
            entry_with_list("2024-01-01", "a", &["x"]),
            entry_with_list("2024-01-02", "a", &["x", "y"]),
        ];

        let rankings = activity_detail_stats(&entries, "a", |_| true, DEFAULT_DETAIL_LIMIT);
        let mru_texts: Vec<&str> = rankings.mru.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(mru_texts, vec!["x", "y"]);
    }

    #[test]
    fn test_filter_applies_before_truncation() {
        // Three values; with limit 2 and "x" filtered out, "z" must be
        // backfilled rather than dropped with the truncated tail.
        let entries = vec![
            entry_with_list("2024-01-01", "a", &["x", "x", "x"]),
            entry_with_list("2024-01-02", "a", &["y", "y"]),
            entry_with_list("2024-01-03", "a", &["z"]),
        ];

        let rankings = activity_detail_stats(&entries, "a", |d| d.text != "x", 2);
        let mfu_texts: Vec<&str> = rankings.mfu.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(mfu_texts, vec!["y", "z"]);
    }

    #[test]
    fn test_summarizer_failure_is_isolated() {
        struct Flaky {
            seen: u64,
        }
        impl Summarizer for Flaky {
            fn id(&self) -> &str {
                "flaky"
            }
            fn accumulate(&mut self, entry: &Entry) -> anyhow::Result<()> {
                if entry.date == date("2024-01-02") {
                    anyhow::bail!("bad entry");
                }
                self.seen += 1;
                Ok(())
            }
            fn finalize(&mut self) -> Value {
                Value::from(self.seen)
            }
        }

        let entries = vec![
            entry_with_count("2024-01-01", "a", 1.0),
            entry_with_count("2024-01-02", "a", 1.0),
            entry_with_count("2024-01-03", "a", 1.0),
        ];

        let mut summarizers: Vec<Box<dyn Summarizer>> = vec![
            Box::new(Flaky { seen: 0 }),
            Box::new(EntryCountSummarizer::default()),
        ];
        let values = run_summaries(&entries, &mut summarizers);

        // The flaky summarizer skipped one entry; the other saw all
        // three.
        assert_eq!(values["flaky"], Value::from(2u64));
        assert_eq!(values["entryCount"], Value::from(3u64));
    }

    #[test]
    fn test_cancellation_discards_partial_results() {
        let entries = vec![
            entry_with_count("2024-01-01", "a", 1.0),
            entry_with_count("2024-01-02", "a", 1.0),
        ];
        let mut summarizers: Vec<Box<dyn Summarizer>> =
            vec![Box::new(EntryCountSummarizer::default())];

        let cancel = AtomicBool::new(true);
        let result = run_summaries_cancellable(&entries, &mut summarizers, &cancel);
        assert!(matches!(result, Err(DaybookError::Cancelled)));
    }

    #[test]
    fn test_mood_distribution() {
        let mood = Uuid::new_v4();
        let mut with_mood = entry_with_count("2024-01-01", "a", 1.0);
        with_mood.mood = Some(mood);
        let entries = vec![with_mood, entry_with_count("2024-01-02", "a", 1.0)];

        let mut summarizers: Vec<Box<dyn Summarizer>> =
            vec![Box::new(MoodDistributionSummarizer::default())];
        let values = run_summaries(&entries, &mut summarizers);

        assert_eq!(values["moodDistribution"][mood.to_string()], Value::from(1u64));
        assert_eq!(values["moodDistribution"]["unset"], Value::from(1u64));
    }
}

//! Learning statistics derived from word timestamps and the status event log.
//!
//! Daily buckets follow these rules for each settled word:
//! - `AlreadyKnown` and `Mastered` count toward their own status on the date
//!   of `status_changed_at`.
//! - `Memorized` counts toward `InProgress` on the date of
//!   `status_changed_at` (the day the word was learned) and toward
//!   `Memorized` on the date of `repeated_at`, once it has been reviewed.
//! - `InProgress` words are not counted.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, Duration, NaiveDate};
use itertools::Itertools;
use log::warn;
use serde::Serialize;

use crate::clock::Clock;
use crate::history;
use crate::store::{StorageResult, WordStore};
use crate::util::mean;
use crate::word::{Word, WordStatus};

/// Longest window, in days, a statistics query covers
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Inclusive range of local calendar dates, at most [`MAX_WINDOW_DAYS`] long
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days` days ending with `today`, clamped to `1..=MAX_WINDOW_DAYS`
    pub fn trailing(days: u32, today: NaiveDate) -> Self {
        let days = days.clamp(1, MAX_WINDOW_DAYS);
        Self {
            start: today
                .checked_sub_days(Days::new(u64::from(days - 1)))
                .unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    /// Dates between `start` and `end` in either order. Ranges longer than
    /// `MAX_WINDOW_DAYS` keep their end date.
    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let earliest = end
            .checked_sub_days(Days::new(u64::from(MAX_WINDOW_DAYS - 1)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start: start.max(earliest),
            end,
        }
    }

    fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.day_count() as i64).map(move |offset| start + Duration::days(offset))
    }

    fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.contains(date)
            .then(|| (date - self.start).num_days() as usize)
    }
}

/// Per-status counts for a single day. All tracked statuses are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCounts {
    pub date: NaiveDate,
    pub counts: BTreeMap<WordStatus, u32>,
}

impl DailyCounts {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            counts: WordStatus::TRACKED.iter().map(|s| (*s, 0)).collect(),
        }
    }

    pub fn get(&self, status: WordStatus) -> u32 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn has_activity(&self) -> bool {
        self.total() > 0
    }

    fn bump(&mut self, status: WordStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
    }
}

/// The (date, bucket) contributions of a single word
fn contributions(word: &Word) -> Vec<(NaiveDate, WordStatus)> {
    if !word.status.is_settled() || word.status == WordStatus::InProgress {
        return Vec::new();
    }

    let Some(changed_at) = word.status_changed_at else {
        warn!(
            "data integrity: word {} ({:?}) is {} but has no status change timestamp",
            word.id, word.value, word.status
        );
        return Vec::new();
    };

    match word.status {
        WordStatus::AlreadyKnown | WordStatus::Mastered => {
            vec![(changed_at.date_naive(), word.status)]
        }
        WordStatus::Memorized => {
            let mut out = vec![(changed_at.date_naive(), WordStatus::InProgress)];
            if let Some(repeated_at) = word.repeated_at.filter(|_| word.repetition_count > 0) {
                out.push((repeated_at.date_naive(), WordStatus::Memorized));
            }
            out
        }
        WordStatus::New | WordStatus::InProgress => Vec::new(),
    }
}

/// One bucket per day of `window`, in chronological order
pub fn daily_status_counts<'a>(
    words: impl IntoIterator<Item = &'a Word>,
    window: &DateWindow,
) -> Vec<DailyCounts> {
    let mut buckets: Vec<DailyCounts> = window.days().map(DailyCounts::empty).collect();

    for word in words {
        for (date, status) in contributions(word) {
            if let Some(idx) = window.index_of(date) {
                buckets[idx].bump(status);
            }
        }
    }

    buckets
}

pub fn activity_days_from_counts(daily: &[DailyCounts]) -> BTreeSet<NaiveDate> {
    daily
        .iter()
        .filter(|d| d.has_activity())
        .map(|d| d.date)
        .collect()
}

/// Consecutive active days ending today. Zero when today has no activity.
pub fn current_streak(active_days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while active_days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive active days
pub fn best_streak(active_days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in active_days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }

    best
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyTotals {
    /// Monday of the ISO week
    pub week_start: NaiveDate,
    pub counts: BTreeMap<WordStatus, u32>,
}

impl WeeklyTotals {
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Roll daily buckets up into ISO weeks, oldest first
pub fn weekly_totals(daily: &[DailyCounts]) -> Vec<WeeklyTotals> {
    daily
        .iter()
        .chunk_by(|d| week_start(d.date))
        .into_iter()
        .map(|(week_start, days)| {
            let mut counts: BTreeMap<WordStatus, u32> =
                WordStatus::TRACKED.iter().map(|s| (*s, 0)).collect();
            for day in days {
                for (status, n) in &day.counts {
                    *counts.entry(*status).or_insert(0) += n;
                }
            }
            WeeklyTotals { week_start, counts }
        })
        .collect()
}

/// Number of words currently in each status, all statuses present
pub fn status_summary<'a>(words: impl IntoIterator<Item = &'a Word>) -> BTreeMap<WordStatus, usize> {
    let mut summary: BTreeMap<WordStatus, usize> =
        WordStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for word in words {
        *summary.entry(word.status).or_insert(0) += 1;
    }
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub window: DateWindow,
    pub daily: Vec<DailyCounts>,
    pub weekly: Vec<WeeklyTotals>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub summary: BTreeMap<WordStatus, usize>,
    pub average_per_day: f64,
}

impl StatisticsSnapshot {
    pub fn build(
        words: &[Word],
        active_days: &BTreeSet<NaiveDate>,
        window: DateWindow,
        today: NaiveDate,
    ) -> Self {
        let daily = daily_status_counts(words, &window);
        let totals: Vec<f64> = daily.iter().map(|d| f64::from(d.total())).collect();

        Self {
            window,
            weekly: weekly_totals(&daily),
            current_streak: current_streak(active_days, today),
            best_streak: best_streak(active_days),
            summary: status_summary(words),
            average_per_day: mean(&totals).unwrap_or(0.0),
            daily,
        }
    }
}

/// Full statistics pass over the store for the trailing `window_days`
pub fn compute_snapshot<S: WordStore + ?Sized>(
    store: &S,
    clock: &dyn Clock,
    window_days: u32,
) -> StorageResult<StatisticsSnapshot> {
    let today = clock.today();
    let words = store.all_words()?;
    let events = store.all_events()?;
    let active_days = history::activity_days(&events);

    Ok(StatisticsSnapshot::build(
        &words,
        &active_days,
        DateWindow::trailing(window_days, today),
        today,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local, TimeZone};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap()
    }

    fn word(status: WordStatus, count: u32, changed: Option<DateTime<Local>>, repeated: Option<DateTime<Local>>) -> Word {
        let mut w = Word::new("word", "translation", at(1, 8));
        w.status = status;
        w.repetition_count = count;
        w.status_changed_at = changed;
        w.repeated_at = repeated;
        w
    }

    #[test]
    fn test_window_trailing_is_inclusive() {
        let window = DateWindow::trailing(7, date(10));
        assert_eq!(window.start, date(4));
        assert_eq!(window.end, date(10));
        let days: Vec<_> = window.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&date(4)));
        assert_eq!(days.last(), Some(&date(10)));
    }

    #[test]
    fn test_window_range_normalizes_order() {
        let window = DateWindow::range(date(9), date(3));
        assert_eq!(window.start, date(3));
        assert_eq!(window.days().count(), 7);
    }

    #[test]
    fn test_window_of_zero_or_one_day_is_today() {
        for days in [0, 1] {
            let window = DateWindow::trailing(days, date(3));
            assert_eq!(window, DateWindow::range(date(3), date(3)));
            assert_eq!(window.days().collect::<Vec<_>>(), vec![date(3)]);
        }
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let window = DateWindow::trailing(u32::MAX, date(10));
        assert_eq!(window, DateWindow::trailing(MAX_WINDOW_DAYS, date(10)));
        assert_eq!(window.days().count(), MAX_WINDOW_DAYS as usize);
        assert_eq!(window.end, date(10));

        let long = DateWindow::range(NaiveDate::MIN, date(10));
        assert_eq!(long, window);
    }

    #[test]
    fn test_window_near_calendar_start_does_not_underflow() {
        let first = NaiveDate::MIN + Duration::days(3);
        let window = DateWindow::trailing(30, first);
        assert_eq!(window.start, NaiveDate::MIN);
        assert_eq!(window.days().count(), 4);
        assert_eq!(daily_status_counts(&[], &window).len(), 4);
    }

    #[test]
    fn test_memorized_then_reviewed_dual_counting() {
        // Seven day window from the 1st to the 7th: memorized on day 3,
        // reviewed successfully on day 5.
        let words = vec![word(WordStatus::Memorized, 2, Some(at(3, 9)), Some(at(5, 20)))];
        let window = DateWindow::trailing(7, date(7));

        let daily = daily_status_counts(&words, &window);
        assert_eq!(daily.len(), 7);

        for bucket in &daily {
            for status in WordStatus::TRACKED {
                let expected = match (bucket.date.day(), status) {
                    (3, WordStatus::InProgress) => 1,
                    (5, WordStatus::Memorized) => 1,
                    _ => 0,
                };
                assert_eq!(bucket.get(status), expected, "{} {}", bucket.date, status);
            }
        }
    }

    #[test]
    fn test_memorized_without_review_counts_once() {
        let words = vec![word(WordStatus::Memorized, 1, Some(at(3, 9)), None)];
        let daily = daily_status_counts(&words, &DateWindow::trailing(7, date(7)));
        let total: u32 = daily.iter().map(DailyCounts::total).sum();
        assert_eq!(total, 1);
        assert_eq!(daily[2].get(WordStatus::InProgress), 1);
    }

    #[test]
    fn test_memorized_with_zero_repetitions_skips_review_bucket() {
        let words = vec![word(WordStatus::Memorized, 0, Some(at(3, 9)), Some(at(5, 9)))];
        let daily = daily_status_counts(&words, &DateWindow::trailing(7, date(7)));
        assert_eq!(daily[4].get(WordStatus::Memorized), 0);
    }

    #[test]
    fn test_known_and_mastered_use_status_date() {
        let words = vec![
            word(WordStatus::AlreadyKnown, 0, Some(at(2, 10)), None),
            word(WordStatus::Mastered, 7, Some(at(6, 10)), Some(at(7, 10))),
            word(WordStatus::Mastered, 8, Some(at(6, 23)), None),
        ];
        let daily = daily_status_counts(&words, &DateWindow::trailing(7, date(7)));

        assert_eq!(daily[1].get(WordStatus::AlreadyKnown), 1);
        assert_eq!(daily[5].get(WordStatus::Mastered), 2);
        assert_eq!(daily[6].total(), 0);
    }

    #[test]
    fn test_new_and_in_progress_are_not_counted() {
        let words = vec![
            word(WordStatus::New, 0, None, None),
            word(WordStatus::InProgress, 0, Some(at(4, 10)), None),
        ];
        let daily = daily_status_counts(&words, &DateWindow::trailing(7, date(7)));
        assert!(daily.iter().all(|d| d.total() == 0));
    }

    #[test]
    fn test_missing_timestamp_contributes_nothing() {
        let words = vec![
            word(WordStatus::Mastered, 6, None, Some(at(5, 10))),
            word(WordStatus::Memorized, 3, None, Some(at(5, 10))),
            word(WordStatus::AlreadyKnown, 0, None, None),
        ];
        let daily = daily_status_counts(&words, &DateWindow::trailing(7, date(7)));
        assert!(daily.iter().all(|d| d.total() == 0));
    }

    #[test]
    fn test_every_bucket_has_all_tracked_statuses() {
        let daily = daily_status_counts(&Vec::<Word>::new(), &DateWindow::trailing(3, date(7)));
        for bucket in daily {
            assert_eq!(bucket.counts.len(), 4);
            assert!(!bucket.counts.contains_key(&WordStatus::New));
        }
    }

    #[test]
    fn test_out_of_window_activity_ignored() {
        let words = vec![word(WordStatus::AlreadyKnown, 0, Some(at(1, 10)), None)];
        let daily = daily_status_counts(&words, &DateWindow::range(date(2), date(4)));
        assert!(daily.iter().all(|d| d.total() == 0));
    }

    #[test]
    fn test_current_streak() {
        let today = date(10);
        let active: BTreeSet<_> = [date(10), date(9), date(8), date(6)].into_iter().collect();
        assert_eq!(current_streak(&active, today), 3);

        let yesterday_only: BTreeSet<_> = [date(9), date(8)].into_iter().collect();
        assert_eq!(current_streak(&yesterday_only, today), 0);
        assert_eq!(current_streak(&BTreeSet::new(), today), 0);
    }

    #[test]
    fn test_best_streak() {
        let active: BTreeSet<_> = [date(1), date(2), date(4), date(5), date(6), date(7), date(9)]
            .into_iter()
            .collect();
        assert_eq!(best_streak(&active), 4);
        assert_eq!(best_streak(&BTreeSet::new()), 0);
    }

    #[test]
    fn test_best_streak_across_month_boundary() {
        let active: BTreeSet<_> = [
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(best_streak(&active), 3);
    }

    #[test]
    fn test_activity_days_from_counts() {
        let words = vec![
            word(WordStatus::AlreadyKnown, 0, Some(at(5, 10)), None),
            word(WordStatus::Memorized, 2, Some(at(6, 10)), Some(at(7, 10))),
        ];
        let daily = daily_status_counts(&words, &DateWindow::trailing(7, date(7)));
        let active = activity_days_from_counts(&daily);
        assert_eq!(current_streak(&active, date(7)), 3);
    }

    #[test]
    fn test_weekly_totals_split_on_monday() {
        // 2024-04-07 is a Sunday, 2024-04-08 a Monday
        let words = vec![
            word(WordStatus::AlreadyKnown, 0, Some(at(6, 10)), None),
            word(WordStatus::AlreadyKnown, 0, Some(at(7, 10)), None),
            word(WordStatus::Mastered, 6, Some(at(8, 10)), None),
        ];
        let daily = daily_status_counts(&words, &DateWindow::range(date(5), date(9)));
        let weekly = weekly_totals(&daily);

        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week_start, date(1));
        assert_eq!(weekly[0].counts[&WordStatus::AlreadyKnown], 2);
        assert_eq!(weekly[1].week_start, date(8));
        assert_eq!(weekly[1].total(), 1);
    }

    #[test]
    fn test_status_summary_has_all_statuses() {
        let words = vec![
            word(WordStatus::New, 0, None, None),
            word(WordStatus::New, 0, None, None),
            word(WordStatus::Mastered, 6, Some(at(2, 10)), None),
        ];
        let summary = status_summary(&words);
        assert_eq!(summary.len(), 5);
        assert_eq!(summary[&WordStatus::New], 2);
        assert_eq!(summary[&WordStatus::Mastered], 1);
        assert_eq!(summary[&WordStatus::InProgress], 0);
    }

    #[test]
    fn test_snapshot_build() {
        let words = vec![word(WordStatus::AlreadyKnown, 0, Some(at(7, 10)), None)];
        let active: BTreeSet<_> = [date(6), date(7)].into_iter().collect();
        let snapshot = StatisticsSnapshot::build(&words, &active, DateWindow::trailing(7, date(7)), date(7));

        assert_eq!(snapshot.daily.len(), 7);
        assert_eq!(snapshot.current_streak, 2);
        assert_eq!(snapshot.best_streak, 2);
        assert!((snapshot.average_per_day - 1.0 / 7.0).abs() < 1e-9);
    }
}

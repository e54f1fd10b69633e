use chrono::{Datelike, NaiveDate};

use crate::stats::DailyCounts;

/// Upper bound for the daily bar chart: the tallest single bar, at least 1
pub fn compute_bar_max(daily: &[DailyCounts]) -> u64 {
    daily
        .iter()
        .flat_map(|d| d.counts.values())
        .copied()
        .max()
        .map(u64::from)
        .unwrap_or(0)
        .max(1)
}

/// Width of each bar so that `groups` groups of `bars_per_group` bars fit
/// `width` columns, with a one column gap between groups
pub fn bar_width(width: u16, groups: usize, bars_per_group: usize) -> u16 {
    if groups == 0 || bars_per_group == 0 {
        return 1;
    }
    let per_group = (width as usize / groups).saturating_sub(1);
    (per_group / bars_per_group).clamp(1, 5) as u16
}

/// Short day label, weekday initial plus day of month ("M 08")
pub fn day_label(date: NaiveDate) -> String {
    let weekday = date.weekday().to_string();
    format!("{} {:02}", &weekday[..1], date.day())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::WordStatus;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    #[test]
    fn test_compute_bar_max_empty() {
        assert_eq!(compute_bar_max(&[]), 1);
        assert_eq!(compute_bar_max(&[DailyCounts::empty(date(1))]), 1);
    }

    #[test]
    fn test_compute_bar_max_takes_tallest_bar() {
        let mut day = DailyCounts::empty(date(1));
        day.counts.insert(WordStatus::Mastered, 4);
        day.counts.insert(WordStatus::AlreadyKnown, 3);
        assert_eq!(compute_bar_max(&[DailyCounts::empty(date(2)), day]), 4);
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar_width(80, 7, 4), 2);
        assert_eq!(bar_width(10, 30, 4), 1);
        assert_eq!(bar_width(200, 2, 4), 5);
        assert_eq!(bar_width(80, 0, 4), 1);
    }

    #[test]
    fn test_day_label() {
        // 2024-04-08 is a Monday
        assert_eq!(day_label(date(8)), "M 08");
        assert_eq!(day_label(date(13)), "S 13");
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}

//! Delivery pace by day of week and time of day.
//!
//! Works on the unclean view (no outlier removal). Counts are taken per
//! (date, enumerator) inside each cell and then averaged across those
//! enumerator-days.

use crate::accuracy::View;
use crate::records::{NormalizedRecord, TimeBracket};
use chrono::{NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeOfDayRow {
    pub bracket: TimeBracket,
    pub mean_deliveries: f64,
    pub enumerator_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOfWeekRow {
    pub day_of_week: Weekday,
    pub mean_deliveries: f64,
    pub enumerator_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossRow {
    pub day_of_week: Weekday,
    pub bracket: TimeBracket,
    pub mean_deliveries: f64,
    pub enumerator_days: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemporalBreakdown {
    pub by_time_of_day: Vec<TimeOfDayRow>,
    pub by_day_of_week: Vec<DayOfWeekRow>,
    pub by_day_and_time: Vec<CrossRow>,
}

/// Running (sum, n) for a mean.
#[derive(Default)]
struct Acc(usize, usize);

impl Acc {
    fn push(&mut self, count: usize) {
        self.0 += count;
        self.1 += 1;
    }

    fn mean(&self) -> f64 {
        self.0 as f64 / self.1 as f64
    }
}

/// Builds all three tables from the records in `view`. Rows are ordered
/// Monday first and by bracket start time, with "Other" last.
pub fn temporal_breakdown(records: &[NormalizedRecord], view: View) -> TemporalBreakdown {
    // (weekday, count) per enumerator-day cell
    let mut cell_counts: BTreeMap<(NaiveDate, &str, TimeBracket), (Weekday, usize)> =
        BTreeMap::new();
    let mut day_counts: BTreeMap<(NaiveDate, &str), (Weekday, usize)> = BTreeMap::new();

    for r in records.iter().filter(|r| r.in_view(view)) {
        cell_counts
            .entry((r.date, r.enumerator.as_str(), r.bracket))
            .or_insert((r.weekday, 0))
            .1 += 1;
        day_counts
            .entry((r.date, r.enumerator.as_str()))
            .or_insert((r.weekday, 0))
            .1 += 1;
    }

    let mut by_time: BTreeMap<TimeBracket, Acc> = BTreeMap::new();
    let mut by_cross: BTreeMap<(u32, TimeBracket), (Weekday, Acc)> = BTreeMap::new();
    for ((_, _, bracket), &(weekday, count)) in &cell_counts {
        by_time.entry(*bracket).or_default().push(count);
        by_cross
            .entry((weekday.num_days_from_monday(), *bracket))
            .or_insert_with(|| (weekday, Acc::default()))
            .1
            .push(count);
    }

    let mut by_day: BTreeMap<u32, (Weekday, Acc)> = BTreeMap::new();
    for &(weekday, count) in day_counts.values() {
        by_day
            .entry(weekday.num_days_from_monday())
            .or_insert_with(|| (weekday, Acc::default()))
            .1
            .push(count);
    }

    TemporalBreakdown {
        by_time_of_day: by_time
            .into_iter()
            .map(|(bracket, acc)| TimeOfDayRow {
                bracket,
                mean_deliveries: acc.mean(),
                enumerator_days: acc.1,
            })
            .collect(),
        by_day_of_week: by_day
            .into_values()
            .map(|(day_of_week, acc)| DayOfWeekRow {
                day_of_week,
                mean_deliveries: acc.mean(),
                enumerator_days: acc.1,
            })
            .collect(),
        by_day_and_time: by_cross
            .into_iter()
            .map(|((_, bracket), (day_of_week, acc))| CrossRow {
                day_of_week,
                bracket,
                mean_deliveries: acc.mean(),
                enumerator_days: acc.1,
            })
            .collect(),
    }
}

//! Daily pace: deliveries per enumerator per day, averaged across enumerators.

use crate::accuracy::View;
use crate::records::NormalizedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPace {
    pub date: NaiveDate,
    /// Mean of per-enumerator delivery counts on `date`.
    pub pace: f64,
    pub enumerators: usize,
    pub deliveries: usize,
}

/// Counts deliveries per (date, enumerator) for records in `view`.
pub fn enumerator_day_counts<'a>(
    records: &'a [NormalizedRecord],
    view: View,
) -> BTreeMap<(NaiveDate, &'a str), usize> {
    let mut counts = BTreeMap::new();
    for r in records.iter().filter(|r| r.in_view(view)) {
        *counts.entry((r.date, r.enumerator.as_str())).or_insert(0) += 1;
    }
    counts
}

/// One [`DailyPace`] per date present in the view, ordered by date.
pub fn daily_pace(records: &[NormalizedRecord], view: View) -> Vec<DailyPace> {
    let mut per_date: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for ((date, _), count) in enumerator_day_counts(records, view) {
        let entry = per_date.entry(date).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += count;
    }

    per_date
        .into_iter()
        .map(|(date, (enumerators, deliveries))| DailyPace {
            date,
            pace: deliveries as f64 / enumerators as f64,
            enumerators,
            deliveries,
        })
        .collect()
}

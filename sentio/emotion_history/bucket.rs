//! Calendar bucketing: events grouped by day, ISO week, or month, each
//! bucket reduced to its dominant label.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{event::EmotionEvent, event::EmotionLabel, tally::LabelTally};

/// Calendar bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Calendar day, keyed `YYYY-MM-DD`.
    Day,
    /// ISO-8601 week, keyed `YYYY-Www` using the ISO week-year.
    IsoWeek,
    /// Calendar month, keyed `YYYY-MM`.
    Month,
}

impl Granularity {
    /// Bucket key for `timestamp`.
    #[must_use]
    pub fn key(self, timestamp: NaiveDateTime) -> BucketKey {
        let date = timestamp.date();
        let key = match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::IsoWeek => {
                let week = date.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Self::Month => format!("{:04}-{:02}", date.year(), date.month()),
        };
        BucketKey(key)
    }
}

/// Formatted bucket key. Lexical order matches chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    /// Key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BucketKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Dominant label per bucket, ordered by key.
pub type BucketSummary = BTreeMap<BucketKey, EmotionLabel>;

/// Groups events into calendar buckets and keeps each bucket's dominant label.
#[must_use]
pub fn aggregate<'a, I>(events: I, granularity: Granularity) -> BucketSummary
where
    I: IntoIterator<Item = &'a EmotionEvent>,
{
    let mut groups: IndexMap<BucketKey, LabelTally> = IndexMap::new();
    for event in events {
        groups
            .entry(granularity.key(event.timestamp()))
            .or_default()
            .observe(event.label());
    }
    groups
        .into_iter()
        .filter_map(|(key, tally)| tally.dominant().map(|label| (key, label)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SignalSource;
    use chrono::NaiveDate;
    use EmotionLabel::{Angry, Happy, Neutral, Sad};

    fn ts(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn event(label: EmotionLabel, at: NaiveDateTime) -> EmotionEvent {
        EmotionEvent::new(label, SignalSource::Camera, at, None).unwrap()
    }

    #[test]
    fn keys_are_zero_padded() {
        let at = ts(2025, 3, 4);
        assert_eq!(Granularity::Day.key(at).as_str(), "2025-03-04");
        assert_eq!(Granularity::IsoWeek.key(at).as_str(), "2025-W10");
        assert_eq!(Granularity::Month.key(at).as_str(), "2025-03");
    }

    #[test]
    fn iso_week_uses_week_year_at_boundaries() {
        // 2024-12-31 is a Tuesday in ISO week 1 of 2025
        assert_eq!(Granularity::IsoWeek.key(ts(2024, 12, 31)).as_str(), "2025-W01");
        // 2021-01-01 is a Friday in ISO week 53 of 2020
        assert_eq!(Granularity::IsoWeek.key(ts(2021, 1, 1)).as_str(), "2020-W53");
        assert_eq!(Granularity::Month.key(ts(2024, 12, 31)).as_str(), "2024-12");
    }

    #[test]
    fn ties_in_a_bucket_go_to_first_seen_label() {
        let day = ts(2025, 5, 1);
        let events = vec![
            event(Sad, day),
            event(Happy, day),
            event(Sad, day),
            event(Happy, day),
        ];
        let daily = aggregate(&events, Granularity::Day);
        assert_eq!(daily.get(&BucketKey::from("2025-05-01")), Some(&Sad));
    }

    #[test]
    fn each_bucket_reduces_independently() {
        let events = vec![
            event(Happy, ts(2025, 5, 1)),
            event(Sad, ts(2025, 5, 1)),
            event(Angry, ts(2025, 5, 2)),
            event(Neutral, ts(2025, 6, 2)),
            event(Neutral, ts(2025, 6, 3)),
        ];
        let daily = aggregate(&events, Granularity::Day);
        assert_eq!(daily.len(), 4);
        assert_eq!(daily[&BucketKey::from("2025-05-01")], Happy);
        assert_eq!(daily[&BucketKey::from("2025-05-02")], Angry);

        let monthly = aggregate(&events, Granularity::Month);
        assert_eq!(monthly[&BucketKey::from("2025-05")], Happy);
        assert_eq!(monthly[&BucketKey::from("2025-06")], Neutral);

        let keys: Vec<_> = daily.keys().map(BucketKey::as_str).collect();
        assert_eq!(
            keys,
            vec!["2025-05-01", "2025-05-02", "2025-06-02", "2025-06-03"]
        );
    }

    #[test]
    fn no_events_no_buckets() {
        assert!(aggregate(&Vec::<EmotionEvent>::new(), Granularity::IsoWeek).is_empty());
    }
}

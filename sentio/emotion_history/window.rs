//! Trailing time window `[now - days, now]`, both ends inclusive.

use chrono::{NaiveDateTime, TimeDelta};

use crate::event::EmotionEvent;

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Closed interval `[now - days, now]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TrailingWindow {
    /// Window of `days` ending at `now`.
    #[must_use]
    pub fn ending_at(now: NaiveDateTime, days: u32) -> Self {
        let start = now
            .checked_sub_signed(TimeDelta::days(i64::from(days)))
            .unwrap_or(NaiveDateTime::MIN);
        Self { start, end: now }
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Inclusive upper bound.
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Whether `timestamp` falls inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Events inside the window, in their original order.
    #[must_use]
    pub fn select<'a>(&self, events: &'a [EmotionEvent]) -> Vec<&'a EmotionEvent> {
        events
            .iter()
            .filter(|event| self.contains(event.timestamp()))
            .collect()
    }
}

/// Events whose timestamp lies in `[now - window_days, now]`.
#[must_use]
pub fn select(events: &[EmotionEvent], now: NaiveDateTime, window_days: u32) -> Vec<&EmotionEvent> {
    TrailingWindow::ending_at(now, window_days).select(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EmotionLabel, SignalSource};
    use chrono::NaiveDate;

    fn ts(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(label: EmotionLabel, at: NaiveDateTime) -> EmotionEvent {
        EmotionEvent::new(label, SignalSource::Voice, at, None).unwrap()
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let now = ts(3, 31, 12);
        let events = vec![
            event(EmotionLabel::Sad, ts(3, 1, 11)),
            event(EmotionLabel::Happy, ts(3, 1, 12)),
            event(EmotionLabel::Angry, ts(3, 31, 12)),
        ];
        let picked = select(&events, now, 30);
        let labels: Vec<_> = picked.iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec![EmotionLabel::Happy, EmotionLabel::Angry]);
    }

    #[test]
    fn events_after_now_are_excluded() {
        let now = ts(3, 10, 0);
        let events = vec![
            event(EmotionLabel::Calm, ts(3, 9, 0)),
            event(EmotionLabel::Bored, ts(3, 11, 0)),
        ];
        assert_eq!(select(&events, now, 30).len(), 1);
    }

    #[test]
    fn empty_input_and_stale_history_yield_nothing() {
        let now = ts(6, 1, 0);
        assert!(select(&[], now, 30).is_empty());
        let stale = vec![event(EmotionLabel::Sad, ts(1, 1, 0))];
        assert!(select(&stale, now, 30).is_empty());
    }

    #[test]
    fn huge_windows_saturate() {
        let window = TrailingWindow::ending_at(ts(1, 1, 0), u32::MAX);
        assert!(window.contains(ts(1, 1, 0)));
        assert!(window.start() < window.end());
    }
}

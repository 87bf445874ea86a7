use std::fmt;

use chrono::{Local, NaiveDateTime, TimeDelta};
use parking_lot::RwLock;

/// Source of "now" for ingestion timestamps and trailing windows.
///
/// Times are naive local wall-clock instants.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> NaiveDateTime;
}

/// Local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock for deterministic boundaries.
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<NaiveDateTime>,
}

impl FixedClock {
    /// Creates a clock frozen at `instant`.
    #[must_use]
    pub const fn new(instant: NaiveDateTime) -> Self {
        Self {
            instant: RwLock::new(instant),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: NaiveDateTime) {
        *self.instant.write() = instant;
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut instant = self.instant.write();
        *instant += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.instant.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 30)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(TimeDelta::hours(2));
        assert_eq!(clock.now(), start + TimeDelta::hours(2));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}

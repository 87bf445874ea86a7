//! Per-user append-only event logs behind one lock per user, with an
//! optional bound on how many events each user keeps.

use std::{collections::HashMap, collections::VecDeque, fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::event::EmotionEvent;

/// Growth bound applied to every user's sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "limit")]
pub enum RetentionPolicy {
    /// Keep every event for the lifetime of the store.
    #[default]
    Unbounded,
    /// Keep at most `n` events per user, evicting oldest first.
    MaxEventsPerUser(usize),
}

impl RetentionPolicy {
    fn limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::MaxEventsPerUser(limit) => Some(limit.max(1)),
        }
    }
}

/// Per-user append-only event log.
///
/// Operations on one user are serialized against each other; operations on
/// different users never contend on the same lock.
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Appends one event, creating the user's sequence if absent.
    fn append(&self, user_id: &str, event: EmotionEvent);

    /// Appends several events as a single step; readers see all or none.
    fn append_batch(&self, user_id: &str, events: Vec<EmotionEvent>);

    /// Snapshot of the user's sequence in insertion order, empty if unknown.
    fn get(&self, user_id: &str) -> Vec<EmotionEvent>;

    /// Number of events currently held for the user.
    fn len(&self, user_id: &str) -> usize;

    /// True if nothing has ever been recorded for the user.
    fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id) == 0
    }
}

type UserLog = Arc<Mutex<VecDeque<EmotionEvent>>>;

/// Volatile store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    retention: RetentionPolicy,
    users: RwLock<HashMap<String, UserLog>>,
}

impl InMemoryEventStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store applying `retention` on every append.
    #[must_use]
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Number of users with at least one event.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    fn existing(&self, user_id: &str) -> Option<UserLog> {
        self.users.read().get(user_id).map(Arc::clone)
    }

    fn slot(&self, user_id: &str) -> UserLog {
        if let Some(log) = self.existing(user_id) {
            return log;
        }
        let mut users = self.users.write();
        Arc::clone(users.entry(user_id.to_owned()).or_default())
    }

    fn evict(&self, log: &mut VecDeque<EmotionEvent>) {
        if let Some(limit) = self.retention.limit() {
            while log.len() > limit {
                log.pop_front();
            }
        }
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, user_id: &str, event: EmotionEvent) {
        let slot = self.slot(user_id);
        let mut log = slot.lock();
        log.push_back(event);
        self.evict(&mut log);
    }

    fn append_batch(&self, user_id: &str, events: Vec<EmotionEvent>) {
        if events.is_empty() {
            return;
        }
        let slot = self.slot(user_id);
        let mut log = slot.lock();
        log.extend(events);
        self.evict(&mut log);
    }

    fn get(&self, user_id: &str) -> Vec<EmotionEvent> {
        self.existing(user_id)
            .map(|log| log.lock().iter().cloned().collect())
            .unwrap_or_default()
    }

    fn len(&self, user_id: &str) -> usize {
        self.existing(user_id).map_or(0, |log| log.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EmotionLabel, SignalSource};
    use chrono::NaiveDate;
    use std::thread;

    fn event(label: EmotionLabel) -> EmotionEvent {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        EmotionEvent::new(label, SignalSource::Camera, ts, None).unwrap()
    }

    fn labels(events: &[EmotionEvent]) -> Vec<EmotionLabel> {
        events.iter().map(EmotionEvent::label).collect()
    }

    #[test]
    fn unknown_user_reads_empty() {
        let store = InMemoryEventStore::new();
        assert!(store.get("ghost").is_empty());
        assert!(store.is_empty("ghost"));
        assert_eq!(store.user_count(), 0);
    }

    #[test]
    fn appends_preserve_insertion_order_per_user() {
        let store = InMemoryEventStore::new();
        store.append("a", event(EmotionLabel::Happy));
        store.append("b", event(EmotionLabel::Angry));
        store.append("a", event(EmotionLabel::Sad));
        assert_eq!(
            labels(&store.get("a")),
            vec![EmotionLabel::Happy, EmotionLabel::Sad]
        );
        assert_eq!(labels(&store.get("b")), vec![EmotionLabel::Angry]);
        assert_eq!(store.user_count(), 2);
    }

    #[test]
    fn retention_evicts_oldest_events() {
        let store = InMemoryEventStore::with_retention(RetentionPolicy::MaxEventsPerUser(2));
        store.append("a", event(EmotionLabel::Happy));
        store.append_batch(
            "a",
            vec![event(EmotionLabel::Sad), event(EmotionLabel::Calm)],
        );
        assert_eq!(
            labels(&store.get("a")),
            vec![EmotionLabel::Sad, EmotionLabel::Calm]
        );
    }

    #[test]
    fn empty_batch_does_not_create_user() {
        let store = InMemoryEventStore::new();
        store.append_batch("a", Vec::new());
        assert_eq!(store.user_count(), 0);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let store = Arc::new(InMemoryEventStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let user = if worker % 2 == 0 { "even" } else { "odd" };
                    for _ in 0..250 {
                        store.append(user, event(EmotionLabel::Neutral));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len("even"), 1000);
        assert_eq!(store.len("odd"), 1000);
    }
}

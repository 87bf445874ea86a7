#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Per-user emotion history: append-only signal logs reduced into daily,
//! ISO-weekly, and monthly dominant labels plus a top-label ranking over a
//! trailing window.

/// Boundary errors.
#[path = "../error.rs"]
pub mod error;

#[path = "../event.rs"]
pub mod event;

/// Injectable time source.
#[path = "../clock.rs"]
pub mod clock;

#[path = "../store.rs"]
pub mod store;

#[path = "../tally.rs"]
pub mod tally;

#[path = "../window.rs"]
pub mod window;

#[path = "../bucket.rs"]
pub mod bucket;

#[path = "../ranking.rs"]
pub mod ranking;

#[path = "../config.rs"]
pub mod config;

#[path = "../telemetry.rs"]
pub mod telemetry;

#[path = "../service.rs"]
pub mod service;

pub use bucket::{aggregate, BucketKey, BucketSummary, Granularity};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{HistoryConfig, RetentionSettings, TelemetrySettings};
pub use error::{HistoryError, HistoryResult};
pub use event::{EmotionEvent, EmotionLabel, ScreeningScores, SignalSource};
pub use ranking::{top_k, LabelCount};
pub use service::{EmotionSummary, HistoryService, Observation, SummaryOutcome};
pub use store::{EventStore, InMemoryEventStore, RetentionPolicy};
pub use tally::LabelTally;
pub use telemetry::{HistoryTelemetry, HistoryTelemetryBuilder};
pub use window::TrailingWindow;

//! History service: ingestion of classified signals and windowed summaries.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    bucket::{aggregate, BucketSummary, Granularity},
    clock::{Clock, SystemClock},
    config::HistoryConfig,
    error::{HistoryError, HistoryResult},
    event::{validate_user_id, EmotionEvent, EmotionLabel, ScreeningScores, SignalSource},
    ranking::{top_k, LabelCount, DEFAULT_TOP_K},
    store::{EventStore, InMemoryEventStore},
    telemetry::HistoryTelemetry,
    window::{TrailingWindow, DEFAULT_WINDOW_DAYS},
};

/// Loosely typed observation as handed over by a classifier or replay log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Owning user.
    pub user_id: String,
    /// Emotion tag, matched case-insensitively.
    pub label: String,
    /// Signal origin tag.
    pub source: String,
    /// Local wall-clock time; the service clock is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    /// Questionnaire totals, `form` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScreeningScores>,
}

/// Windowed summary of one user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSummary {
    /// Dominant label per day.
    pub daily: BucketSummary,
    /// Dominant label per ISO week.
    pub weekly: BucketSummary,
    /// Dominant label per month.
    pub monthly: BucketSummary,
    /// Most frequent labels over the whole window.
    pub top_labels: Vec<LabelCount>,
    /// Events that fell inside the window.
    pub total_analyzed: usize,
}

/// Result of a summary query for a user with recorded history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "status",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SummaryOutcome {
    /// At least one event fell inside the window.
    Summary(EmotionSummary),
    /// History exists, but none of it is recent enough.
    EmptyWindow {
        /// Window that was searched, in days.
        window_days: u32,
        /// Events recorded for the user overall.
        total_recorded: usize,
        /// Always zero; mirrors the populated summary's field.
        total_analyzed: usize,
    },
}

impl SummaryOutcome {
    /// Events analyzed; zero for an empty window.
    #[must_use]
    pub const fn total_analyzed(&self) -> usize {
        match self {
            Self::Summary(summary) => summary.total_analyzed,
            Self::EmptyWindow { total_analyzed, .. } => *total_analyzed,
        }
    }

    /// The populated summary, if any.
    #[must_use]
    pub const fn summary(&self) -> Option<&EmotionSummary> {
        match self {
            Self::Summary(summary) => Some(summary),
            Self::EmptyWindow { .. } => None,
        }
    }
}

/// Sole owner of user histories; every read and write goes through here.
#[derive(Debug, Clone)]
pub struct HistoryService {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    window_days: u32,
    top_k: usize,
    telemetry: Option<HistoryTelemetry>,
}

impl Default for HistoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryService {
    /// In-memory store, system clock, 30-day window, top two labels.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(Arc::new(InMemoryEventStore::new()), Arc::new(SystemClock))
    }

    /// Creates a service from explicit collaborators.
    #[must_use]
    pub fn with_parts(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            window_days: DEFAULT_WINDOW_DAYS,
            top_k: DEFAULT_TOP_K,
            telemetry: None,
        }
    }

    /// Builds the store, window, ranking size, and telemetry from `config`.
    pub fn from_config(config: &HistoryConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(InMemoryEventStore::with_retention(
            config.retention.policy(),
        ));
        let mut service = Self::with_parts(store, clock);
        service.window_days = config.window_days;
        service.top_k = config.top_k;
        if config.telemetry.log_path.is_some() || config.telemetry.event_log.is_some() {
            let telemetry = HistoryTelemetry::builder("emotion_history")
                .settings(&config.telemetry)?
                .build()?;
            service.set_telemetry(telemetry);
        }
        Ok(service)
    }

    /// Overrides the default trailing window.
    #[must_use]
    pub const fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    /// Overrides the number of ranked labels.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: HistoryTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Sets telemetry after construction.
    pub fn set_telemetry(&mut self, telemetry: HistoryTelemetry) {
        self.telemetry = Some(telemetry);
    }

    /// Returns telemetry handle if configured.
    #[must_use]
    pub fn telemetry(&self) -> Option<&HistoryTelemetry> {
        self.telemetry.as_ref()
    }

    /// Configured trailing window, in days.
    #[must_use]
    pub const fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Appends one classified signal to the user's history.
    pub fn record(
        &self,
        user_id: &str,
        label: EmotionLabel,
        source: SignalSource,
        timestamp: Option<NaiveDateTime>,
        scores: Option<ScreeningScores>,
    ) -> HistoryResult<EmotionEvent> {
        let event = validate_user_id(user_id)
            .and_then(|()| {
                let at = timestamp.unwrap_or_else(|| self.clock.now());
                EmotionEvent::new(label, source, at, scores)
            })
            .map_err(|err| self.rejected(user_id, &err))?;
        self.store.append(user_id, event.clone());
        self.recorded(user_id, std::slice::from_ref(&event));
        Ok(event)
    }

    /// Parses and records a loosely typed observation.
    pub fn ingest(&self, observation: &Observation) -> HistoryResult<EmotionEvent> {
        let label = observation
            .label
            .parse::<EmotionLabel>()
            .map_err(|err| self.rejected(&observation.user_id, &err))?;
        let source = observation
            .source
            .parse::<SignalSource>()
            .map_err(|err| self.rejected(&observation.user_id, &err))?;
        self.record(
            &observation.user_id,
            label,
            source,
            observation.timestamp,
            observation.scores,
        )
    }

    /// Scores a PHQ-9/GAD-7 questionnaire and records the derived label.
    pub fn record_form(
        &self,
        user_id: &str,
        phq9: &[u8],
        gad7: &[u8],
    ) -> HistoryResult<EmotionEvent> {
        let scores = ScreeningScores::from_answers(phq9, gad7)
            .map_err(|err| self.rejected(user_id, &err))?;
        self.record(
            user_id,
            scores.classify(),
            SignalSource::Form,
            None,
            Some(scores),
        )
    }

    /// Records every label of one free-text classification under one
    /// timestamp. Nothing is recorded unless every label is valid.
    pub fn record_text<I, S>(&self, user_id: &str, labels: I) -> HistoryResult<Vec<EmotionEvent>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let events: Vec<EmotionEvent> = validate_user_id(user_id)
            .and_then(|()| {
                let parsed = labels
                    .into_iter()
                    .map(|raw| raw.as_ref().parse::<EmotionLabel>())
                    .collect::<HistoryResult<Vec<_>>>()?;
                if parsed.is_empty() {
                    return Err(HistoryError::validation(
                        "label",
                        "text classification produced no labels",
                    ));
                }
                let at = self.clock.now();
                parsed
                    .into_iter()
                    .map(|label| EmotionEvent::new(label, SignalSource::Text, at, None))
                    .collect()
            })
            .map_err(|err| self.rejected(user_id, &err))?;
        self.store.append_batch(user_id, events.clone());
        self.recorded(user_id, &events);
        Ok(events)
    }

    /// Full recorded history in insertion order, scores included.
    pub fn history(&self, user_id: &str) -> HistoryResult<Vec<EmotionEvent>> {
        validate_user_id(user_id)?;
        Ok(self.store.get(user_id))
    }

    /// Summarizes the configured window ending at the clock's current time.
    pub fn summarize(&self, user_id: &str) -> HistoryResult<SummaryOutcome> {
        self.summarize_with(user_id, self.clock.now(), self.window_days)
    }

    /// Summarizes the window `[now - window_days, now]`.
    pub fn summarize_with(
        &self,
        user_id: &str,
        now: NaiveDateTime,
        window_days: u32,
    ) -> HistoryResult<SummaryOutcome> {
        validate_user_id(user_id).map_err(|err| self.rejected(user_id, &err))?;
        if window_days == 0 {
            return Err(self.rejected(
                user_id,
                &HistoryError::validation("window_days", "must be at least 1"),
            ));
        }
        let events = self.store.get(user_id);
        if events.is_empty() {
            self.log(
                LogLevel::Info,
                "history.summarize.no_history",
                json!({ "user_id": user_id }),
            );
            return Err(HistoryError::NoHistory {
                user_id: user_id.to_owned(),
            });
        }

        let window = TrailingWindow::ending_at(now, window_days);
        let recent = window.select(&events);
        if recent.is_empty() {
            self.log(
                LogLevel::Info,
                "history.summarize.empty_window",
                json!({ "user_id": user_id, "window_days": window_days, "recorded": events.len() }),
            );
            return Ok(SummaryOutcome::EmptyWindow {
                window_days,
                total_recorded: events.len(),
                total_analyzed: 0,
            });
        }

        let summary = EmotionSummary {
            daily: aggregate(recent.iter().copied(), Granularity::Day),
            weekly: aggregate(recent.iter().copied(), Granularity::IsoWeek),
            monthly: aggregate(recent.iter().copied(), Granularity::Month),
            top_labels: top_k(recent.iter().copied(), self.top_k),
            total_analyzed: recent.len(),
        };
        self.log(
            LogLevel::Debug,
            "history.summarize",
            json!({
                "user_id": user_id,
                "window_days": window_days,
                "analyzed": summary.total_analyzed,
                "days": summary.daily.len(),
            }),
        );
        if let Some(tel) = &self.telemetry {
            let _ = tel.event(
                "history.summary.served",
                json!({ "user_id": user_id, "analyzed": summary.total_analyzed }),
            );
        }
        Ok(SummaryOutcome::Summary(summary))
    }

    fn recorded(&self, user_id: &str, events: &[EmotionEvent]) {
        if let Some(tel) = &self.telemetry {
            for event in events {
                let payload = json!({
                    "user_id": user_id,
                    "label": event.label(),
                    "source": event.source(),
                    "timestamp": event.timestamp(),
                });
                let _ = tel.log(LogLevel::Info, "history.record", payload.clone());
                let _ = tel.event("emotion.recorded", payload);
            }
        }
    }

    fn rejected(&self, user_id: &str, err: &HistoryError) -> HistoryError {
        self.log(
            LogLevel::Warn,
            "history.rejected",
            json!({ "user_id": user_id, "error": err.to_string() }),
        );
        err.clone()
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }
}

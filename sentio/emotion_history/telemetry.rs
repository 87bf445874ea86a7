//! Optional log and event sinks for the history service, assembled with a
//! builder from explicit sinks or `[telemetry]` settings.

use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord, FileEventPublisher};
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};
use tokio::runtime::{Handle, Runtime};

use crate::config::TelemetrySettings;

/// Builder configuring history telemetry sinks.
pub struct HistoryTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    log_sink: Option<Arc<dyn LogSink>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl HistoryTelemetryBuilder {
    /// Creates a new builder for the given module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            log_sink: None,
            event_publisher: None,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops file log records below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Uses an explicit sink instead of a log file.
    #[must_use]
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Registers the publisher receiving history events.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Applies the `[telemetry]` settings.
    pub fn settings(mut self, settings: &TelemetrySettings) -> Result<Self> {
        if let Some(path) = &settings.log_path {
            self.log_path = Some(path.clone());
        }
        if let Some(path) = &settings.event_log {
            self.event_publisher = Some(Arc::new(FileEventPublisher::new(path)?));
        }
        if let Some(level) = settings.min_level {
            self.min_level = level;
        }
        Ok(self)
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<HistoryTelemetry> {
        let logger: Option<Arc<dyn LogSink>> = match (self.log_sink, self.log_path) {
            (Some(sink), _) => Some(sink),
            (None, Some(path)) => Some(Arc::new(JsonLogger::with_min_level(
                path,
                self.min_level,
            )?)),
            (None, None) => None,
        };
        let event = self.event_publisher.map(EventHandle::new).transpose()?;
        Ok(HistoryTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                event,
            }),
        })
    }
}

/// Telemetry handle used by the history service.
#[derive(Clone)]
pub struct HistoryTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for HistoryTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryTelemetry")
            .field("module", &self.inner.module)
            .field("logs", &self.inner.logger.is_some())
            .field("events", &self.inner.event.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<Arc<dyn LogSink>>,
    event: Option<EventHandle>,
}

struct EventHandle {
    runtime: Runtime,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime, publisher })
    }

    fn publish(&self, record: EventRecord) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            // inside a runtime: block_on would panic, hand off instead
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(record).await {
                    eprintln!("history event publish failed: {err:?}");
                }
            });
            Ok(())
        } else {
            self.runtime.block_on(self.publisher.publish(record))
        }
    }
}

impl HistoryTelemetry {
    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> HistoryTelemetryBuilder {
        HistoryTelemetryBuilder::new(module)
    }

    /// Logs a structured record.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
            logger.write(&record)?;
        }
        Ok(())
    }

    /// Emits an event on the configured publisher.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(EventRecord::new(&self.inner.module, event_type, payload))?;
        }
        Ok(())
    }
}

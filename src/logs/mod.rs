//! Service logging.
//!
//! Every `tracing` event goes to stdout, optionally to a daily rolling file,
//! and into an in-memory ring buffer that `GET /logs` reads from. Events
//! emitted while a test case runs carry its `test_case_id`.

use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogsConfig;

mod layer;

pub use layer::LogBufferLayer;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must be held for the lifetime of the process.
pub fn init_tracing(config: &LogsConfig, buffer: LogBuffer) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "casebench.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .with(LogBufferLayer::new(buffer))
        .try_init()?;

    Ok(guard)
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    pub target: String,
    /// Structured event fields other than the message and test case id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

/// Bounded, shareable log history. Oldest entries are evicted first; live
/// subscribers that fall behind the broadcast channel miss entries.
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<RwLock<VecDeque<Arc<LogEntry>>>>,
    capacity: usize,
    live: broadcast::Sender<Arc<LogEntry>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let (live, _) = broadcast::channel(1024);

        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            live,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let entry = Arc::new(entry);
        // no subscribers is fine
        let _ = self.live.send(entry.clone());

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All buffered entries matching `filter`, oldest first.
    pub fn get_entries(&self, filter: &LogFilter) -> Vec<Arc<LogEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// The newest `limit` entries matching `filter`, oldest first.
    pub fn get_recent(&self, limit: usize, filter: &LogFilter) -> Vec<Arc<LogEntry>> {
        let entries = self.entries.read();
        let mut recent: Vec<_> = entries
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .cloned()
            .collect();

        recent.reverse();
        recent
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LogEntry>> {
        self.live.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct LogFilter {
    pub test_case_id: Option<String>,
    pub min_level: Option<LogLevel>,
    pub since: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_case_id(mut self, test_case_id: impl Into<String>) -> Self {
        self.test_case_id = Some(test_case_id.into());
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(id) = &self.test_case_id {
            if entry.test_case_id.as_ref() != Some(id) {
                return false;
            }
        }

        self.min_level.is_none_or(|min| entry.level >= min)
            && self.since.is_none_or(|since| entry.timestamp >= since)
    }
}

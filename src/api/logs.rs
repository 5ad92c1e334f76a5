use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::api::AppState;
use crate::logs::{LogEntry, LogFilter, LogLevel};

const DEFAULT_LIMIT: usize = 100;

/// Query parameters for `GET /logs` and `GET /logs/stream`. Unparseable
/// `level` or `since` values are ignored rather than rejected.
#[derive(Debug, Deserialize, Default)]
pub struct LogsQuery {
    pub test_case_id: Option<String>,
    /// Minimum level: trace, debug, info, warn or error.
    pub level: Option<String>,
    /// `GET /logs`: maximum entries returned. Stream: historical entries sent first.
    pub limit: Option<usize>,
    /// RFC 3339.
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<Arc<LogEntry>>,
}

impl LogsQuery {
    fn to_filter(&self) -> LogFilter {
        let mut filter = LogFilter::new();

        if let Some(test_case_id) = &self.test_case_id {
            filter = filter.with_test_case_id(test_case_id);
        }
        if let Some(level) = self.level.as_deref().and_then(|l| l.parse::<LogLevel>().ok()) {
            filter = filter.with_min_level(level);
        }
        if let Some(since) = self.since.as_deref().and_then(|s| s.parse::<DateTime<Utc>>().ok()) {
            filter = filter.with_since(since);
        }

        filter
    }
}

/// GET /logs
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let filter = query.to_filter();
    let logs = state
        .log_buffer
        .get_recent(query.limit.unwrap_or(DEFAULT_LIMIT), &filter);

    Json(LogsResponse { logs })
}

/// GET /logs/stream: buffered history first, then live entries as SSE events.
pub async fn stream_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = query.to_filter();
    let preload = query.limit.unwrap_or(state.logs_config.stream_preload_count);

    // subscribe before reading history so nothing pushed in between is lost
    let receiver = state.log_buffer.subscribe();
    let history = state.log_buffer.get_recent(preload, &filter);

    let history = tokio_stream::iter(history).map(|entry| Ok::<_, Infallible>(to_event(&entry)));
    let live = BroadcastStream::new(receiver).filter_map(move |received| match received {
        Ok(entry) if filter.matches(&entry) => Some(Ok::<_, Infallible>(to_event(&entry))),
        // filtered out or lagged
        _ => None,
    });

    Sse::new(history.chain(live)).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)))
}

fn to_event(entry: &LogEntry) -> Event {
    Event::default().data(serde_json::to_string(entry).unwrap_or_default())
}

//! Run history bookkeeping.
//!
//! `testRuns` is append-only and newest first. A record is never edited once
//! it is in the list; the only way to drop records is to delete the test case.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::testcase::TestCase;
use crate::testing::{Outcome, RunStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub result: String,
    pub status: RunStatus,
    pub logs: Vec<String>,
    pub initiated_by: String,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(outcome: Outcome, initiated_by: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            result: outcome.result,
            status: outcome.status,
            logs: outcome.logs,
            initiated_by: initiated_by.into(),
            created_at,
        }
    }
}

/// Timestamp for the next record: now, unless the clock has not moved past
/// the newest record, in which case one microsecond after it.
pub fn next_timestamp(history: &[RunRecord]) -> DateTime<Utc> {
    let now = Utc::now();
    match history.first() {
        Some(newest) if newest.created_at >= now => newest.created_at + TimeDelta::microseconds(1),
        _ => now,
    }
}

/// Moves `record` to one microsecond after `newest` if it is not already
/// strictly newer.
pub fn restamp(record: &mut RunRecord, newest: Option<&RunRecord>) {
    if let Some(newest) = newest {
        if record.created_at <= newest.created_at {
            record.created_at = newest.created_at + TimeDelta::microseconds(1);
        }
    }
}

/// Prepends `record` and mirrors its status into `recentRun`.
pub fn record_run(test_case: &mut TestCase, mut record: RunRecord) {
    restamp(&mut record, test_case.test_runs.first());

    test_case.recent_run = Some(record.status);
    test_case.test_runs.insert(0, record);
}

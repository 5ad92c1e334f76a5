use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Pass => "pass",
            RunStatus::Fail => "fail",
            RunStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Everything an evaluation produces. Persisting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: RunStatus,
    /// Short diagnostic: the failure or error message, or a pass summary.
    pub result: String,
    pub logs: Vec<String>,
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        self.status == RunStatus::Pass
    }
}

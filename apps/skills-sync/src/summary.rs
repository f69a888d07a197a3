use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::RecordError;

/// Lifecycle of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Authenticated,
    Processing,
    Completed,
    Aborted,
}

/// A row that could not be applied, kept for the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub line: u64,
    pub identifier: Option<String>,
    pub code: &'static str,
    pub reason: String,
}

impl RecordFailure {
    pub fn new(line: u64, identifier: Option<String>, error: &RecordError) -> Self {
        Self {
            line,
            identifier,
            code: error.code(),
            reason: error.to_string(),
        }
    }
}

/// Structured result of a completed run, independent of how it is displayed.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub failures: Vec<RecordFailure>,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, failure: RecordFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn total(&self) -> u32 {
        self.succeeded + self.failed + self.skipped
    }

    pub fn finish(&mut self) {
        self.state = RunState::Completed;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_failures() {
        let mut summary = RunSummary::start();
        summary.record_success();
        summary.record_skip();
        summary.record_failure(RecordFailure::new(
            4,
            Some("002".into()),
            &RecordError::Rejected {
                status: 404,
                message: "not found".into(),
            },
        ));
        summary.finish();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].code, "REJECTED");
        assert_eq!(summary.state, RunState::Completed);
        assert!(summary.finished_at.is_some());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["failures"][0]["identifier"], "002");
    }
}

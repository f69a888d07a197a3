//! Update dispatcher: pushes mapped rows to the candidate store one at a time.
//!
//! Per-record failures are logged and counted; nothing in here aborts a run.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::errors::{AuthError, RecordError};
use crate::mapping::{CandidateUpdate, RowOutcome};
use crate::summary::{RecordFailure, RunState, RunSummary};

/// Target of candidate field updates.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn update_candidate(&self, update: &CandidateUpdate) -> Result<(), RecordError>;
}

/// Exchanges configured credentials for an authenticated `CandidateStore`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<Box<dyn CandidateStore>, AuthError>;
}

/// Applies every row outcome to `store`, sequentially, recording results in `summary`.
pub async fn dispatch<I>(store: &dyn CandidateStore, rows: I, summary: &mut RunSummary)
where
    I: Iterator<Item = RowOutcome> + Send,
{
    summary.state = RunState::Processing;

    for outcome in rows {
        match outcome {
            RowOutcome::Mapped(update) => match store.update_candidate(&update).await {
                Ok(()) => {
                    info!(
                        "Updated candidate {} ({}) with {} fields",
                        update.label(),
                        update.identifier,
                        update.fields.len()
                    );
                    summary.record_success();
                }
                Err(e) => {
                    error!(
                        "Failed to update candidate {} ({}) from line {}: {e}",
                        update.label(),
                        update.identifier,
                        update.line
                    );
                    summary.record_failure(RecordFailure::new(
                        update.line,
                        Some(update.identifier.clone()),
                        &e,
                    ));
                }
            },
            RowOutcome::Skipped { line, display } => {
                match display {
                    Some(name) => warn!("Employee {name} on line {line} needs a Bullhorn ID entered"),
                    None => warn!("Line {line} has no identifier; skipped"),
                }
                summary.record_skip();
            }
            RowOutcome::Invalid(failure) => {
                error!(
                    "Line {} ({}) could not be mapped: {}",
                    failure.line,
                    failure.identifier.as_deref().unwrap_or("no identifier"),
                    failure.reason
                );
                summary.record_failure(failure);
            }
        }
    }
}

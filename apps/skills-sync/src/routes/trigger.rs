use axum::{extract::State, Json};

use crate::errors::SyncError;
use crate::state::AppState;
use crate::summary::RunSummary;

/// POST /api/BullhornMassCandidateUpdate
/// Runs one full sync and answers with its summary.
pub async fn handle_mass_update(
    State(state): State<AppState>,
) -> Result<Json<RunSummary>, SyncError> {
    let _guard = state
        .run_lock
        .try_lock()
        .map_err(|_| SyncError::AlreadyRunning)?;

    let summary = state.job.run().await?;
    Ok(Json(summary))
}

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::pipeline::SyncJob;

/// Shared application state injected into the trigger handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub job: SyncJob,
    /// Held for the duration of a run; a second trigger meanwhile gets 409.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(job: SyncJob) -> Self {
        Self {
            job,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

use std::sync::Arc;

use tracing::{error, info};

use crate::dispatch::{dispatch, Authenticator};
use crate::errors::SyncError;
use crate::mapping::RowMapper;
use crate::source::BlobSource;
use crate::summary::{RunState, RunSummary};

/// Where the survey lives inside the blob store.
#[derive(Debug, Clone)]
pub struct BlobLocation {
    pub container: String,
    pub blob: String,
}

/// One fetch → map → authenticate → dispatch run, wired from its collaborators.
#[derive(Clone)]
pub struct SyncJob {
    source: Arc<dyn BlobSource>,
    authenticator: Arc<dyn Authenticator>,
    mapper: Arc<RowMapper>,
    location: BlobLocation,
}

impl SyncJob {
    pub fn new(
        source: Arc<dyn BlobSource>,
        authenticator: Arc<dyn Authenticator>,
        mapper: RowMapper,
        location: BlobLocation,
    ) -> Self {
        Self {
            source,
            authenticator,
            mapper: Arc::new(mapper),
            location,
        }
    }

    /// Runs the whole batch. `Err` means the run was aborted (fetch, schema or
    /// auth failure); per-record failures are reported inside the summary.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::start();
        info!(run_id = %summary.run_id, "Skills sync run started");

        match self.execute(&mut summary).await {
            Ok(()) => {
                summary.finish();
                info!(
                    run_id = %summary.run_id,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "Skills sync run completed"
                );
                Ok(summary)
            }
            Err(e) => {
                summary.state = RunState::Aborted;
                error!(run_id = %summary.run_id, "Skills sync run aborted: {e}");
                Err(e)
            }
        }
    }

    async fn execute(&self, summary: &mut RunSummary) -> Result<(), SyncError> {
        let BlobLocation { container, blob } = &self.location;
        let data = self.source.fetch(container, blob).await?;

        // Header problems surface here, before any call to the target system.
        let rows = self.mapper.map(&data)?;
        info!("Source header has {} columns", rows.headers().len());

        let store = self.authenticator.authenticate().await?;
        summary.state = RunState::Authenticated;
        info!("Authenticated against candidate store");

        dispatch(store.as_ref(), rows, summary).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bullhorn::mock::{client_for, MockBullhorn};
    use crate::dispatch::tests::MemoryStore;
    use crate::dispatch::CandidateStore;
    use crate::errors::{AuthError, FetchError, SchemaError};
    use crate::mapping::MappingConfig;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct StaticSource(Option<&'static str>);

    #[async_trait]
    impl BlobSource for StaticSource {
        async fn fetch(&self, container: &str, blob: &str) -> Result<Bytes, FetchError> {
            self.0
                .map(|csv| Bytes::from_static(csv.as_bytes()))
                .ok_or_else(|| FetchError::NotFound {
                    container: container.to_string(),
                    blob: blob.to_string(),
                })
        }
    }

    struct FakeAuth {
        store: Option<MemoryStore>,
        calls: Mutex<u32>,
    }

    impl FakeAuth {
        fn granting(store: &MemoryStore) -> Self {
            Self {
                store: Some(store.clone()),
                calls: Mutex::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                store: None,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        async fn authenticate(&self) -> Result<Box<dyn CandidateStore>, AuthError> {
            *self.calls.lock().unwrap() += 1;
            match &self.store {
                Some(store) => Ok(Box::new(store.clone())),
                None => Err(AuthError::Rejected {
                    stage: "token",
                    status: 401,
                    message: "bad credentials".into(),
                }),
            }
        }
    }

    fn mapper() -> RowMapper {
        RowMapper::new(
            MappingConfig::from_json(
                r#"{
                    "identifier_column": "Employee ID",
                    "display_column": "Name",
                    "rules": [
                        {"kind": "tags", "column": "Domains", "field": "domains"},
                        {"kind": "flag", "column": "Skills", "field": "skills"}
                    ]
                }"#,
            )
            .unwrap(),
        )
    }

    fn location() -> BlobLocation {
        BlobLocation {
            container: "engineerskills-file".into(),
            blob: "skills.csv".into(),
        }
    }

    const SURVEY: &str = "Employee ID,Name,Domains,Skills\n\
                          001,Ada,\"X, Y, Z\",Yes\n\
                          002,Bob,X,No\n\
                          ,Carol,Y,Yes\n\
                          003,Dan,,no\n";

    #[tokio::test]
    async fn test_run_continues_past_rejected_record() {
        let store = MemoryStore::with_candidates(&["001", "003"]);
        let auth = Arc::new(FakeAuth::granting(&store));
        let job = SyncJob::new(
            Arc::new(StaticSource(Some(SURVEY))),
            auth.clone(),
            mapper(),
            location(),
        );

        let summary = job.run().await.unwrap();

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!((summary.succeeded, summary.failed, summary.skipped), (2, 1, 1));
        assert_eq!(summary.failures[0].identifier.as_deref(), Some("002"));
        assert_eq!(summary.failures[0].code, "REJECTED");
        assert_eq!(auth.calls(), 1);

        let records = store.snapshot();
        assert_eq!(records["001"]["domains"], "X, Y, Z");
        assert_eq!(records["001"]["skills"], true);
        assert_eq!(records["003"]["skills"], false);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = MemoryStore::with_candidates(&["001", "002", "003"]);
        let job = SyncJob::new(
            Arc::new(StaticSource(Some(SURVEY))),
            Arc::new(FakeAuth::granting(&store)),
            mapper(),
            location(),
        );

        job.run().await.unwrap();
        let first = store.snapshot();
        let second_summary = job.run().await.unwrap();

        assert_eq!(store.snapshot(), first);
        assert_eq!(second_summary.succeeded, 3);
    }

    #[tokio::test]
    async fn test_missing_identifier_column_aborts_before_auth() {
        let store = MemoryStore::with_candidates(&["001"]);
        let auth = Arc::new(FakeAuth::granting(&store));
        let job = SyncJob::new(
            Arc::new(StaticSource(Some("Name,Domains\nAda,X\n"))),
            auth.clone(),
            mapper(),
            location(),
        );

        let err = job.run().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Schema(SchemaError::MissingIdentifier { .. })
        ));
        assert_eq!(auth.calls(), 0);
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let store = MemoryStore::default();
        let auth = Arc::new(FakeAuth::granting(&store));
        let job = SyncJob::new(Arc::new(StaticSource(None)), auth.clone(), mapper(), location());

        let err = job.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(FetchError::NotFound { .. })));
        assert_eq!(auth.calls(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts() {
        let job = SyncJob::new(
            Arc::new(StaticSource(Some(SURVEY))),
            Arc::new(FakeAuth::rejecting()),
            mapper(),
            location(),
        );

        let err = job.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_against_mock_bullhorn() {
        let mock = MockBullhorn::start().await;
        mock.not_found("002");
        let job = SyncJob::new(
            Arc::new(StaticSource(Some(SURVEY))),
            Arc::new(client_for(&mock, "api.user", "correct-horse")),
            mapper(),
            location(),
        );

        let summary = job.run().await.unwrap();

        assert_eq!((summary.succeeded, summary.failed, summary.skipped), (2, 1, 1));
        let state = mock.state();
        assert_eq!(state.logins, 1);
        assert_eq!(
            state.candidates["001"],
            serde_json::json!({"domains": "X, Y, Z", "skills": true})
        );
        assert_eq!(
            state.candidates["003"],
            serde_json::json!({"domains": "", "skills": false})
        );
    }
}

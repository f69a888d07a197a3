use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::bullhorn::RetryPolicy;
use crate::dispatch::CandidateStore;
use crate::errors::RecordError;
use crate::mapping::CandidateUpdate;

/// An authenticated REST session. Read-only once created; lives for one run.
#[derive(Clone)]
pub struct BullhornSession {
    http: Client,
    rest_url: Url,
    token: String,
    expires_at: Option<DateTime<Utc>>,
    retry: RetryPolicy,
}

impl fmt::Debug for BullhornSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BullhornSession")
            .field("rest_url", &self.rest_url.as_str())
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct BullhornErrorBody {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

impl BullhornSession {
    pub fn new(
        http: Client,
        rest_url: Url,
        token: String,
        expires_at: Option<DateTime<Utc>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            rest_url,
            token,
            expires_at,
            retry,
        }
    }

    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    #[cfg(test)]
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// `{restUrl}entity/Candidate/{id}`, with the identifier percent-encoded as one segment.
    fn candidate_url(&self, identifier: &str) -> Url {
        let mut url = self.rest_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["entity", "Candidate", identifier]);
        }
        url
    }
}

#[async_trait]
impl CandidateStore for BullhornSession {
    async fn update_candidate(&self, update: &CandidateUpdate) -> Result<(), RecordError> {
        let url = self.candidate_url(&update.identifier);
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    "Update of candidate {} failed ({}), retry {} after {}ms...",
                    update.identifier,
                    last_error,
                    attempt - 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .http
                .post(url.clone())
                .query(&[("BhRestToken", self.token.as_str())])
                .json(&update.fields)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("status {}: {}", status.as_u16(), body);
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<BullhornErrorBody>(&body)
                    .ok()
                    .and_then(|e| e.error_message)
                    .unwrap_or(body);
                return Err(RecordError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!(
                "Candidate {} accepted {} fields on attempt {}",
                update.identifier,
                update.fields.len(),
                attempt
            );
            return Ok(());
        }

        Err(RecordError::Transient {
            attempts: self.retry.max_attempts,
            message: last_error,
        })
    }
}

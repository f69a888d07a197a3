//! Bullhorn REST client — the only module that talks to the applicant-tracking system.
//!
//! `auth` implements the OAuth authorize → token → REST login exchange and
//! yields a `BullhornSession`; `session` issues candidate field updates with
//! bounded retry of transient failures.

pub mod auth;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use reqwest::{redirect, Client};

use crate::config::{BullhornConfig, HttpConfig};

pub use session::BullhornSession;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exponential backoff for transient (network, 429, 5xx) failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before `attempt` (1-based): none for the first, then base, 2·base, 4·base…
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.base_delay
                .checked_mul(1u32 << (attempt - 2).min(16))
                .unwrap_or(Duration::MAX)
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(http: &HttpConfig) -> Self {
        Self {
            max_attempts: http.max_retries.max(1),
            base_delay: http.retry_base_delay,
        }
    }
}

/// Unauthenticated client holding credentials; `login` turns it into a session.
#[derive(Clone)]
pub struct BullhornClient {
    http: Client,
    /// The authorize step answers with a redirect whose target we must not follow.
    auth_http: Client,
    config: BullhornConfig,
    retry: RetryPolicy,
}

impl BullhornClient {
    pub fn new(config: BullhornConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder()
                .timeout(http.timeout)
                .connect_timeout(CONNECT_TIMEOUT)
                .build()?,
            auth_http: Client::builder()
                .timeout(http.timeout)
                .connect_timeout(CONNECT_TIMEOUT)
                .redirect(redirect::Policy::none())
                .build()?,
            config,
            retry: RetryPolicy::from(http),
        })
    }
}

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_AUTH_URL: &str = "https://auth.bullhornstaffing.com/oauth";
const DEFAULT_CONTAINER: &str = "engineerskills-file";
const DEFAULT_BLOB: &str = "skillsSurveyData.csv";

/// Application configuration loaded from environment variables.
/// Built once in `main` and handed to each component at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Required for the object-storage source; a local directory run can do without it.
    pub blob_connection_string: Option<String>,
    pub blob_container: String,
    pub blob_name: String,
    pub mapping_path: Option<PathBuf>,
    pub bullhorn: BullhornConfig,
    pub http: HttpConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Credentials and endpoints for the Bullhorn OAuth + REST login flow.
#[derive(Clone)]
pub struct BullhornConfig {
    pub auth_url: String,
    pub rest_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BullhornConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BullhornConfig")
            .field("auth_url", &self.auth_url)
            .field("rest_url", &self.rest_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Total attempts per request, first try included.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let http = HttpConfig {
            timeout: Duration::from_secs(
                or_default("HTTP_TIMEOUT_SECS", "30")
                    .parse()
                    .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_retries: or_default("MAX_RETRIES", "3")
                .parse::<u32>()
                .context("MAX_RETRIES must be a non-negative integer")?
                .max(1),
            retry_base_delay: Duration::from_millis(
                or_default("RETRY_BASE_DELAY_MS", "500")
                    .parse()
                    .context("RETRY_BASE_DELAY_MS must be a whole number of milliseconds")?,
            ),
        };

        Ok(Config {
            blob_connection_string: lookup("BLOB_CONNECTION_STRING")
                .filter(|v| !v.trim().is_empty()),
            blob_container: or_default("BLOB_CONTAINER", DEFAULT_CONTAINER),
            blob_name: or_default("BLOB_NAME", DEFAULT_BLOB),
            mapping_path: lookup("COLUMN_MAPPING_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            bullhorn: BullhornConfig {
                auth_url: or_default("BULLHORN_AUTH_URL", DEFAULT_AUTH_URL),
                rest_url: require("BULLHORN_REST_URL")?,
                client_id: require("BULLHORN_CLIENT_ID")?,
                client_secret: require("BULLHORN_CLIENT_SECRET")?,
                username: require("BULLHORN_USERNAME")?,
                password: require("BULLHORN_PASSWORD")?,
            },
            http,
            port: or_default("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}

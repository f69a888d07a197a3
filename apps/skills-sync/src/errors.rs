use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Object-storage failures. Always terminal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Blob '{blob}' not found in container '{container}'")]
    NotFound { container: String, blob: String },

    #[error("Storage rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error while fetching blob: {0}")]
    Network(String),

    #[error("I/O error while reading blob: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the Bullhorn login flow. Always terminal for the run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{stage} rejected (status {status}): {message}")]
    Rejected {
        stage: &'static str,
        status: u16,
        message: String,
    },

    #[error("{stage} response is missing '{field}'")]
    MissingField {
        stage: &'static str,
        field: &'static str,
    },

    #[error("{stage} returned an unusable URL '{url}'")]
    InvalidUrl { stage: &'static str, url: String },

    #[error("HTTP error during authentication: {0}")]
    Http(#[from] reqwest::Error),
}

/// Header-level problems with the source CSV. Raised before any API call.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Identifier column '{column}' is missing from the header row")]
    MissingIdentifier { column: String },

    #[error("Unreadable header row: {0}")]
    Malformed(String),
}

/// Per-row failures. Logged and counted; never abort the batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("Column '{column}' has unsupported value '{value}' (expected {expected})")]
    InvalidValue {
        column: String,
        value: String,
        expected: String,
    },

    #[error("Malformed CSV record: {0}")]
    Malformed(String),

    #[error("Target rejected update (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Update failed after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },
}

impl RecordError {
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::InvalidValue { .. } => "INVALID_VALUE",
            RecordError::Malformed(_) => "MALFORMED_RECORD",
            RecordError::Rejected { .. } => "REJECTED",
            RecordError::Transient { .. } => "TRANSIENT",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid blob connection string: {0}")]
    ConnectionString(String),

    #[error("Invalid column mapping: {0}")]
    Mapping(String),

    #[error("Failed to read column mapping '{path}': {source}")]
    MappingFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal outcome of a run. Anything here moves the run to `Aborted`.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("A sync run is already in progress")]
    AlreadyRunning,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            SyncError::Fetch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "FETCH_ERROR"),
            SyncError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SCHEMA_ERROR"),
            SyncError::Auth(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_ERROR"),
            SyncError::AlreadyRunning => (StatusCode::CONFLICT, "ALREADY_RUNNING"),
        };

        if status.is_server_error() {
            tracing::error!("Sync run aborted: {self}");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

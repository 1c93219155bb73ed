use siteqa_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("plan {0} has no backing asset")]
    MissingAsset(String),

    #[error("no upload URL issued for {0}")]
    MissingUploadUrl(String),

    #[error("{} section(s) failed to save: {}", .0.len(), .0.join(", "))]
    SaveIncomplete(Vec<String>),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Build a `Server` error, preferring the backend's `{"error": ...}` message.
    pub(crate) fn server(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
        SyncError::Server {
            status,
            body: message.unwrap_or(body),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger file {path} is corrupt: {source}")]
    Corrupt {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not replace ledger file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("ledger write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

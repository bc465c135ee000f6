use thiserror::Error;

/// Failure talking to the backend. Always recoverable.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request cancelled")]
    Cancelled,

    /// The request task ended without reporting back.
    #[error("request task ended unexpectedly")]
    Abandoned,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
#[error("markdown formatting failed: {0}")]
pub struct FormatError(pub String);

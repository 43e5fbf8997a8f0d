// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Directory not found: {0}")]
    SourceNotFound(String),
    #[error("Download failed: {0}")]
    DownloadFailed(String),
    #[error("Unsupported or unprobeable source: {0}")]
    ProbeUnsupported(String),
    #[error("Archive is corrupt or password protected: {0}")]
    ArchiveCorrupt(String),
    #[error("Extraction failed: {0}")]
    ExtractFailed(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Cancelled by user")]
    UserCancelled,
    #[error("{0}")]
    PreconditionUnmet(String),
    #[error("Another task is already running")]
    TaskBusy,
    #[error("User {0} is not allowed to submit tasks")]
    Unauthorized(i64),
    #[error("No {kind} track at index {index}")]
    TrackNotFound { kind: String, index: usize },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Network middleware error: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Text shown to the user as the cancellation reason.
    pub fn reason(&self) -> String {
        match self {
            AppError::SourceNotFound(_) => "Directory not found.".to_string(),
            AppError::UserCancelled => "Cancelled by user.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

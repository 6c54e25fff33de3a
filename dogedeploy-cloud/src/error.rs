//! Deployment error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cloud and deploy operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur while deploying to DogeCloud.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("local path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("upload failed for {key}: {message}")]
    Upload { key: String, message: String },

    #[error("delete failed for {key}: {message}")]
    Delete { key: String, message: String },

    #[error("list failed: {0}")]
    List(String),

    #[error("DogeCloud API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("temporary S3 credentials expired")]
    CredentialExpired,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk local tree: {0}")]
    Walk(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<walkdir::Error> for CloudError {
    fn from(err: walkdir::Error) -> Self {
        // Preserve NotFound for a root that vanished between the check and the walk.
        if let Some(io) = err.io_error()
            && io.kind() == std::io::ErrorKind::NotFound
            && err.depth() == 0
            && let Some(path) = err.path()
        {
            return CloudError::NotFound(path.to_path_buf());
        }
        CloudError::Walk(err.to_string())
    }
}

impl CloudError {
    /// Returns the remote key a per-object failure refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            CloudError::Upload { key, .. } | CloudError::Delete { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Credential and configuration failures that no retry can fix. Every
    /// later operation would hit them too, so they end the whole deploy.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            CloudError::Api { .. } | CloudError::CredentialExpired | CloudError::Config(_)
        )
    }
}

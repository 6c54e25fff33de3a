//! Shared types for deploy operations.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// S3 key pair and session token issued by `/auth/tmp_token.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmpCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

/// One bucket the temporary token grants access to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucket {
    /// Console-facing bucket name.
    pub name: String,
    #[serde(rename = "s3Bucket")]
    pub s3_bucket: String,
    #[serde(rename = "s3Endpoint")]
    pub s3_endpoint: String,
}

/// Temporary S3 token returned by the DogeCloud control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmpToken {
    #[serde(rename = "Credentials")]
    pub credentials: TmpCredentials,
    /// Unix timestamp (seconds).
    #[serde(rename = "ExpiredAt")]
    pub expired_at: i64,
    #[serde(rename = "Buckets", default)]
    pub buckets: Vec<TokenBucket>,
}

impl TmpToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.expired_at, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns true if the token will expire within the given seconds.
    pub fn expires_within_secs(&self, secs: i64) -> bool {
        Utc::now() + chrono::Duration::seconds(secs) >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    /// Picks the bucket entry matching `name`, falling back to the first.
    pub fn bucket(&self, name: &str) -> Option<&TokenBucket> {
        self.buckets
            .iter()
            .find(|b| b.name == name)
            .or_else(|| self.buckets.first())
    }
}

/// A local regular file scheduled for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub size: u64,
    pub content_type: &'static str,
}

/// Per-invocation deploy inputs.
#[derive(Clone, Debug)]
pub struct DeployOptions {
    pub local_path: PathBuf,
    pub remote_root_path: String,
    pub delete_removed: bool,
    /// Overrides `SyncConfig::max_concurrency` for this run.
    pub max_concurrency: Option<usize>,
}

impl DeployOptions {
    pub fn new(local_path: impl Into<PathBuf>, remote_root_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_root_path: remote_root_path.into(),
            delete_removed: false,
            max_concurrency: None,
        }
    }

    pub fn delete_removed(mut self, enabled: bool) -> Self {
        self.delete_removed = enabled;
        self
    }

    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }
}

/// Outcome of the delete phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Keys selected for deletion, as listed by the store.
    pub planned: Vec<String>,
    pub deleted: usize,
    pub failed_keys: Vec<String>,
    /// The plan exceeded the mass-deletion ratio.
    pub mass_delete_flagged: bool,
    /// Deletion was skipped because of the mass-deletion policy.
    pub aborted: bool,
}

/// Summary of one deploy run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeployResult {
    pub uploaded_count: usize,
    pub total_files: usize,
    pub deployment_url: String,
    pub total_bytes: u64,
    pub duration_ms: u64,
    pub deleted_count: usize,
    /// Upload failures first, then delete failures.
    pub failed_keys: Vec<String>,
}

impl DeployResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed_keys.is_empty()
    }
}

//! Deployment configuration.

use crate::error::{CloudError, CloudResult};
use serde::{Deserialize, Serialize};

/// Configuration for the DogeCloud client stack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL for the DogeCloud control-plane API.
    pub api_base_url: String,

    /// Bucket name as shown in the DogeCloud console (not the S3 bucket id).
    pub bucket_name: String,

    /// Region passed to the S3 client. DogeCloud ignores it.
    pub s3_region: String,

    /// Optional S3 endpoint override (for MinIO in testing). When unset the
    /// endpoint returned with the temporary token is used.
    pub s3_endpoint_override: Option<String>,

    /// Use path-style addressing instead of virtual-hosted buckets.
    pub s3_force_path_style: bool,

    /// Credential refresh margin in seconds (refresh before expiry).
    pub credential_refresh_margin_secs: i64,

    /// CDN domain used to build the advisory deployment URL.
    pub cdn_domain: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.dogecloud.com".to_string(),
            bucket_name: String::new(),
            s3_region: "auto".to_string(),
            s3_endpoint_override: None,
            s3_force_path_style: false,
            credential_refresh_margin_secs: 300, // 5 minutes before expiry
            cdn_domain: "dogecdn.com".to_string(),
        }
    }
}

impl CloudConfig {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Self::default()
        }
    }
}

/// What to do when reconciliation would delete most of the bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassDeletePolicy {
    /// Log a warning and delete anyway.
    #[default]
    Warn,
    /// Skip the delete phase for this run.
    Abort,
}

/// Tunables for the upload and delete schedulers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum uploads in flight. Deletes use `min(max_concurrency, 3)`.
    pub max_concurrency: usize,

    /// Total put attempts per file, including the first.
    pub retry_attempts: u32,

    /// Delay before the second attempt; doubles after each failure.
    pub retry_delay_ms: u64,

    /// Fraction of the remote snapshot above which a delete plan is flagged.
    pub mass_delete_ratio: f64,

    pub mass_delete_policy: MassDeletePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            mass_delete_ratio: 0.8,
            mass_delete_policy: MassDeletePolicy::Warn,
        }
    }
}

impl SyncConfig {
    /// Rejects settings the schedulers cannot run with.
    pub fn validate(&self) -> CloudResult<()> {
        if self.max_concurrency == 0 {
            return Err(CloudError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(CloudError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mass_delete_ratio) {
            return Err(CloudError::Config(format!(
                "mass_delete_ratio must be within 0..=1, got {}",
                self.mass_delete_ratio
            )));
        }
        Ok(())
    }

    /// Concurrency cap for the delete phase.
    pub fn delete_concurrency(&self) -> usize {
        self.max_concurrency.clamp(1, 3)
    }
}

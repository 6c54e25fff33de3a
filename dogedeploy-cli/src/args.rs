//! Command-line and CI-input parsing.
//!
//! Every option can also be supplied through the `INPUT_<NAME>` environment
//! variables a CI runner sets for step inputs.

use clap::Parser;
use dogedeploy_cloud::{CloudConfig, DeployOptions, MassDeletePolicy, SyncConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dogedeploy")]
#[command(author, version, about = "Deploy a local directory to a DogeCloud bucket", long_about = None)]
pub struct Args {
    /// DogeCloud API access key
    #[arg(long, env = "INPUT_API-KEY", hide_env_values = true)]
    pub api_key: String,

    /// DogeCloud API secret key
    #[arg(long, env = "INPUT_SECRET-KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Bucket name as shown in the DogeCloud console
    #[arg(long, env = "INPUT_BUCKET-NAME")]
    pub bucket_name: String,

    /// Local directory or file to deploy
    #[arg(long, env = "INPUT_LOCAL-PATH", default_value = "./dist")]
    pub local_path: PathBuf,

    /// Remote root path inside the bucket
    #[arg(long, env = "INPUT_REMOTE-PATH", default_value = "/")]
    pub remote_path: String,

    /// Delete remote files that no longer exist locally
    #[arg(long, env = "INPUT_DELETE-REMOVED")]
    pub delete_removed: bool,

    /// Maximum concurrent uploads
    #[arg(long, env = "INPUT_MAX-CONCURRENCY", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_concurrency: u32,

    /// Total upload attempts per file
    #[arg(long, env = "INPUT_RETRY-ATTEMPTS", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub retry_attempts: u32,

    /// Delay before the first retry in milliseconds; doubles per attempt
    #[arg(long, env = "INPUT_RETRY-DELAY", default_value_t = 1000)]
    pub retry_delay: u64,

    /// Control-plane API base URL
    #[arg(long, env = "INPUT_API-ENDPOINT", default_value = "https://api.dogecloud.com")]
    pub api_endpoint: String,

    /// Skip cleanup instead of warning when most of the bucket would be deleted
    #[arg(long, env = "INPUT_ABORT-ON-MASS-DELETE")]
    pub abort_on_mass_delete: bool,

    /// Exit non-zero when any upload or delete failed
    #[arg(long, env = "INPUT_FAIL-ON-ERROR")]
    pub fail_on_error: bool,

    /// Log filter used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn cloud_config(&self) -> CloudConfig {
        CloudConfig {
            api_base_url: self.api_endpoint.trim_end_matches('/').to_string(),
            ..CloudConfig::new(self.bucket_name.clone())
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_concurrency: self.max_concurrency as usize,
            retry_attempts: self.retry_attempts,
            retry_delay_ms: self.retry_delay,
            mass_delete_policy: if self.abort_on_mass_delete {
                MassDeletePolicy::Abort
            } else {
                MassDeletePolicy::Warn
            },
            ..SyncConfig::default()
        }
    }

    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions::new(self.local_path.clone(), self.remote_path.clone())
            .delete_removed(self.delete_removed)
            .max_concurrency(self.max_concurrency as usize)
    }
}

//! DogeCloud deployment engine.
//!
//! Syncs a local directory (or single file) into a DogeCloud bucket:
//! - Control-plane API client with HMAC-SHA1 request signing
//! - Temporary S3 credential management with auto-refresh
//! - Bounded-concurrency uploads with exponential-backoff retry
//! - Optional cleanup of remote objects that no longer exist locally

pub mod api_client;
pub mod config;
pub mod credential_manager;
pub mod deployer;
pub mod enumerate;
pub mod error;
pub mod keys;
pub mod mime;
pub mod object_store;
pub mod progress;
pub mod reconcile;
pub mod retry;
pub mod s3_transport;
pub mod types;
pub mod upload;

pub use config::{CloudConfig, MassDeletePolicy, SyncConfig};
pub use deployer::Deployer;
pub use error::{CloudError, CloudResult};
pub use object_store::{DogeCloudStore, ObjectStore};
pub use progress::{DeployProgress, ProgressCallback};
pub use types::*;

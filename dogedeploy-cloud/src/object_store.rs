//! The object-store seam the deploy engine talks to.
//!
//! [`DogeCloudStore`] is the production implementation. It owns the
//! control-plane client, the credential manager and the S3 transport for
//! one deploy invocation; nothing is cached process-wide.

use crate::api_client::DogeCloudApiClient;
use crate::config::CloudConfig;
use crate::credential_manager::CredentialManager;
use crate::error::CloudResult;
use crate::s3_transport::S3Transport;
use async_trait::async_trait;
use std::sync::Arc;

pub use aws_sdk_s3::primitives::ByteStream;

/// Minimal bucket interface: put, delete, and a fully materialized listing.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Acquires whatever the store needs before the first operation.
    ///
    /// Errors here abort the deploy; stores without setup keep the default.
    async fn prepare(&self) -> CloudResult<()> {
        Ok(())
    }

    /// Streams `body` to `key`. Fails with `CloudError::Upload`.
    async fn put(&self, key: &str, body: ByteStream, content_type: &str) -> CloudResult<String>;

    /// Removes `key`. Fails with `CloudError::Delete`.
    async fn delete(&self, key: &str) -> CloudResult<()>;

    /// Lists every key in the bucket. Fails with `CloudError::List`.
    async fn list_all_keys(&self) -> CloudResult<Vec<String>>;

    /// Bucket identity used to build the deployment URL.
    fn bucket_name(&self) -> &str;
}

/// DogeCloud bucket accessed through temporary S3 credentials.
pub struct DogeCloudStore {
    config: CloudConfig,
    cred_manager: CredentialManager,
    transport: S3Transport,
}

impl DogeCloudStore {
    pub fn new(
        config: CloudConfig,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> CloudResult<Self> {
        let api = Arc::new(DogeCloudApiClient::new(
            config.clone(),
            access_key,
            secret_key,
        )?);
        Ok(Self::with_api(config, api))
    }

    /// Builds a store around an existing API client.
    pub fn with_api(config: CloudConfig, api: Arc<DogeCloudApiClient>) -> Self {
        let cred_manager = CredentialManager::new(api, config.credential_refresh_margin_secs);
        let transport = S3Transport::new(
            config.bucket_name.clone(),
            config.s3_region.clone(),
            config.s3_endpoint_override.clone(),
            config.s3_force_path_style,
        );
        Self {
            config,
            cred_manager,
            transport,
        }
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.cred_manager
    }
}

#[async_trait]
impl ObjectStore for DogeCloudStore {
    /// Exchanges the API keys for a temporary token up front, so bad keys
    /// fail the run instead of every upload.
    async fn prepare(&self) -> CloudResult<()> {
        self.cred_manager.get_token().await.map(|_| ())
    }

    async fn put(&self, key: &str, body: ByteStream, content_type: &str) -> CloudResult<String> {
        let token = self.cred_manager.get_token().await?;
        self.transport.put(&token, key, body, content_type).await?;
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> CloudResult<()> {
        let token = self.cred_manager.get_token().await?;
        self.transport.delete(&token, key).await
    }

    async fn list_all_keys(&self) -> CloudResult<Vec<String>> {
        let token = self.cred_manager.get_token().await?;
        self.transport.list_all_keys(&token).await
    }

    fn bucket_name(&self) -> &str {
        &self.config.bucket_name
    }
}

//! S3 put/delete/list operations using DogeCloud temporary credentials.
//!
//! The S3 client is built lazily from the first token and cached until the
//! credential manager hands out a token from a newer refresh generation.

use crate::credential_manager::IssuedToken;
use crate::error::{CloudError, CloudResult};
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::RwLock;
use tracing::debug;

struct CachedClient {
    generation: u64,
    client: S3Client,
    s3_bucket: String,
}

/// S3 transport for a single DogeCloud bucket.
pub struct S3Transport {
    bucket_name: String,
    region: String,
    endpoint_override: Option<String>,
    force_path_style: bool,
    cached: RwLock<Option<CachedClient>>,
}

impl S3Transport {
    pub fn new(
        bucket_name: String,
        region: String,
        endpoint_override: Option<String>,
        force_path_style: bool,
    ) -> Self {
        Self {
            bucket_name,
            region,
            endpoint_override,
            force_path_style,
            cached: RwLock::new(None),
        }
    }

    /// Builds an S3 client from a temporary token.
    fn build_client(&self, issued: &IssuedToken) -> CloudResult<CachedClient> {
        let token = &issued.token;
        let bucket = token.bucket(&self.bucket_name).ok_or_else(|| {
            CloudError::Config(format!(
                "temporary token grants no bucket matching {}",
                self.bucket_name
            ))
        })?;

        let credentials = aws_credential_types::Credentials::new(
            &token.credentials.access_key_id,
            &token.credentials.secret_access_key,
            (!token.credentials.session_token.is_empty())
                .then(|| token.credentials.session_token.clone()),
            None,
            "dogecloud-tmp-token",
        );

        let endpoint = self
            .endpoint_override
            .clone()
            .unwrap_or_else(|| bucket.s3_endpoint.clone());

        let config = aws_sdk_s3::Config::builder()
            .region(aws_types::region::Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .force_path_style(self.force_path_style)
            .behavior_version_latest()
            .build();

        debug!(
            "built S3 client for bucket {} (generation {})",
            bucket.s3_bucket, issued.generation
        );

        Ok(CachedClient {
            generation: issued.generation,
            client: S3Client::from_conf(config),
            s3_bucket: bucket.s3_bucket.clone(),
        })
    }

    /// Returns the cached client, rebuilding it if the token generation moved.
    async fn client(&self, issued: &IssuedToken) -> CloudResult<(S3Client, String)> {
        if issued.token.is_expired() {
            return Err(CloudError::CredentialExpired);
        }

        {
            let cached = self.cached.read().await;
            if let Some(ref c) = *cached
                && c.generation == issued.generation
            {
                return Ok((c.client.clone(), c.s3_bucket.clone()));
            }
        }

        let mut cached = self.cached.write().await;
        // Last writer wins; a concurrent rebuild for the same generation is harmless.
        if let Some(ref c) = *cached
            && c.generation >= issued.generation
        {
            return Ok((c.client.clone(), c.s3_bucket.clone()));
        }
        let built = self.build_client(issued)?;
        let out = (built.client.clone(), built.s3_bucket.clone());
        *cached = Some(built);
        Ok(out)
    }

    /// Uploads an object with the given content type, streaming `body`.
    pub async fn put(
        &self,
        issued: &IssuedToken,
        key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> CloudResult<()> {
        let (client, s3_bucket) = self.client(issued).await?;

        client
            .put_object()
            .bucket(&s3_bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| CloudError::Upload {
                key: key.to_string(),
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

        debug!("uploaded s3://{s3_bucket}/{key}");
        Ok(())
    }

    /// Deletes an object.
    pub async fn delete(&self, issued: &IssuedToken, key: &str) -> CloudResult<()> {
        let (client, s3_bucket) = self.client(issued).await?;

        client
            .delete_object()
            .bucket(&s3_bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CloudError::Delete {
                key: key.to_string(),
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

        debug!("deleted s3://{s3_bucket}/{key}");
        Ok(())
    }

    /// Lists every key in the bucket, following continuation tokens.
    pub async fn list_all_keys(&self, issued: &IssuedToken) -> CloudResult<Vec<String>> {
        let (client, s3_bucket) = self.client(issued).await?;
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = client
                .list_objects_v2()
                .bucket(&s3_bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    CloudError::List(format!(
                        "list failed for bucket {s3_bucket}: {}",
                        aws_sdk_s3::error::DisplayErrorContext(e)
                    ))
                })?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            );

            match resp.next_continuation_token() {
                Some(next) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(next.to_string());
                }
                _ => break,
            }
        }

        debug!("listed {} keys in s3://{s3_bucket}", keys.len());
        Ok(keys)
    }
}

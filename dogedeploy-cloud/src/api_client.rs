//! HTTP client for the DogeCloud control-plane API.
//!
//! Every call is a signed POST: the `Authorization` header carries
//! `TOKEN <access_key>:<hex hmac-sha1(secret_key, path + "\n" + body)>`.
//! Responses are wrapped in a `{ code, msg, data }` envelope where any
//! `code` other than 200 is an error, regardless of HTTP status.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::types::TmpToken;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha1::Sha1;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;

const TMP_TOKEN_PATH: &str = "/auth/tmp_token.json";

#[derive(serde::Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// HTTP client for the DogeCloud control plane.
pub struct DogeCloudApiClient {
    client: Client,
    config: CloudConfig,
    access_key: String,
    secret_key: String,
}

impl DogeCloudApiClient {
    pub fn new(
        config: CloudConfig,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> CloudResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        })
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Computes the request signature for `api_path` and the exact body sent.
    pub fn sign(&self, api_path: &str, body: &str) -> CloudResult<String> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| CloudError::Config(format!("invalid secret key: {e}")))?;
        mac.update(api_path.as_bytes());
        mac.update(b"\n");
        mac.update(body.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// POSTs a JSON body to `api_path` and unwraps the response envelope.
    pub async fn call_json<B, T>(&self, api_path: &str, body: &B) -> CloudResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)?;
        let authorization = format!("TOKEN {}:{}", self.access_key, self.sign(api_path, &body)?);
        let url = format!("{}{}", self.config.api_base_url, api_path);

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(CloudError::Api {
                    code: i64::from(status.as_u16()),
                    message: format!("API Error: HTTP {status}"),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if envelope.code != 200 {
            return Err(CloudError::Api {
                code: envelope.code,
                message: format!("API Error: {}", envelope.msg),
            });
        }

        debug!("DogeCloud API call {api_path} succeeded");
        envelope.data.ok_or_else(|| CloudError::Api {
            code: envelope.code,
            message: format!("API Error: response to {api_path} carried no data"),
        })
    }

    // ── Auth ──

    /// Requests a temporary S3 token scoped to the configured bucket.
    pub async fn get_tmp_token(&self) -> CloudResult<TmpToken> {
        let body = serde_json::json!({
            "channel": "OSS_FULL",
            "scopes": [format!("{}:*", self.config.bucket_name)],
        });
        self.call_json(TMP_TOKEN_PATH, &body).await
    }
}

//! Temporary-token caching and refresh behavior against a mock control plane.

use chrono::Utc;
use dogedeploy_cloud::api_client::DogeCloudApiClient;
use dogedeploy_cloud::config::CloudConfig;
use dogedeploy_cloud::credential_manager::CredentialManager;
use dogedeploy_cloud::error::CloudError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/auth/tmp_token.json";
const MARGIN_SECS: i64 = 300;

fn manager(server: &MockServer) -> CredentialManager {
    let config = CloudConfig {
        api_base_url: server.uri(),
        ..CloudConfig::new("blog")
    };
    let api = DogeCloudApiClient::new(config, "ak", "sk").unwrap();
    CredentialManager::new(Arc::new(api), MARGIN_SECS)
}

fn token_response(session: &str, expires_in_secs: i64) -> serde_json::Value {
    serde_json::json!({
        "code": 200,
        "msg": "OK",
        "data": {
            "Credentials": {
                "accessKeyId": "tmp-ak",
                "secretAccessKey": "tmp-sk",
                "sessionToken": session
            },
            "ExpiredAt": Utc::now().timestamp() + expires_in_secs,
            "Buckets": [{
                "name": "blog",
                "s3Bucket": "s-sh-1234-blog",
                "s3Endpoint": "https://cos.example"
            }]
        }
    })
}

// ── Caching ──

#[tokio::test]
async fn no_token_initially() {
    let server = MockServer::start().await;
    let manager = manager(&server);
    assert!(!manager.has_valid_token().await);
    assert_eq!(manager.generation().await, 0);
}

#[tokio::test]
async fn fresh_token_is_fetched_once_and_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("s1", 7200)))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager(&server);
    let first = manager.get_token().await.unwrap();
    let second = manager.get_token().await.unwrap();

    assert_eq!(first.generation, 1);
    assert_eq!(second.generation, 1);
    assert_eq!(second.token.credentials.session_token, "s1");
    assert!(manager.has_valid_token().await);
}

#[tokio::test]
async fn token_inside_refresh_margin_is_replaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("short", 100)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("long", 7200)))
        .mount(&server)
        .await;

    let manager = manager(&server);
    let first = manager.get_token().await.unwrap();
    assert_eq!(first.token.credentials.session_token, "short");
    assert!(!manager.has_valid_token().await);

    let second = manager.get_token().await.unwrap();
    assert_eq!(second.token.credentials.session_token, "long");
    assert_eq!(second.generation, 2);
}

#[tokio::test]
async fn forced_refresh_bumps_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("s", 7200)))
        .expect(2)
        .mount(&server)
        .await;

    let manager = manager(&server);
    manager.get_token().await.unwrap();
    let refreshed = manager.refresh().await.unwrap();
    assert_eq!(refreshed.generation, 2);
}

#[tokio::test]
async fn clear_forces_next_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("s", 7200)))
        .expect(2)
        .mount(&server)
        .await;

    let manager = manager(&server);
    manager.get_token().await.unwrap();
    manager.clear().await;
    assert!(!manager.has_valid_token().await);
    manager.get_token().await.unwrap();
}

// ── Single Flight ──

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_response("shared", 7200))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager(&server);
    let results = futures::future::join_all((0..8).map(|_| manager.get_token())).await;

    for result in results {
        let issued = result.unwrap();
        assert_eq!(issued.generation, 1);
        assert_eq!(issued.token.credentials.session_token, "shared");
    }
}

// ── Errors ──

#[tokio::test]
async fn api_error_propagates_and_keeps_state_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 401,
            "msg": "invalid access key"
        })))
        .mount(&server)
        .await;

    let manager = manager(&server);
    let err = manager.get_token().await.unwrap_err();

    assert!(matches!(err, CloudError::Api { code: 401, .. }));
    assert!(!manager.has_valid_token().await);
    assert_eq!(manager.generation().await, 0);
}

//! Temporary-token lifecycle management with auto-refresh.
//!
//! Holds one DogeCloud temporary token per deploy, refreshing it via the
//! API client before it expires. Refreshes are serialized: callers that
//! queued behind an in-flight refresh reuse its result instead of issuing
//! their own request.

use crate::api_client::DogeCloudApiClient;
use crate::error::CloudResult;
use crate::types::TmpToken;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// A token together with the refresh generation that produced it.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: TmpToken,
    /// Bumped on every successful refresh; transports key cached clients on it.
    pub generation: u64,
}

struct TokenState {
    token: Option<TmpToken>,
    generation: u64,
}

/// Manages temporary S3 credentials with auto-refresh.
pub struct CredentialManager {
    api: Arc<DogeCloudApiClient>,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<()>,
    refresh_margin_secs: i64,
}

impl CredentialManager {
    pub fn new(api: Arc<DogeCloudApiClient>, refresh_margin_secs: i64) -> Self {
        Self {
            api,
            state: RwLock::new(TokenState {
                token: None,
                generation: 0,
            }),
            refresh_lock: Mutex::new(()),
            refresh_margin_secs,
        }
    }

    /// Gets a valid token, refreshing if needed.
    pub async fn get_token(&self) -> CloudResult<IssuedToken> {
        let pre_gen = {
            let state = self.state.read().await;
            if let Some(ref t) = state.token {
                if !t.expires_within_secs(self.refresh_margin_secs) {
                    return Ok(IssuedToken {
                        token: t.clone(),
                        generation: state.generation,
                    });
                }
                debug!(
                    "temporary token expiring within {}s, refreshing",
                    self.refresh_margin_secs
                );
            }
            state.generation
        };

        let _guard = self.refresh_lock.lock().await;

        // A refresh that completed while we waited already did the work.
        {
            let state = self.state.read().await;
            if state.generation > pre_gen
                && let Some(ref t) = state.token
                && !t.expires_within_secs(self.refresh_margin_secs)
            {
                return Ok(IssuedToken {
                    token: t.clone(),
                    generation: state.generation,
                });
            }
        }

        self.fetch_and_store().await
    }

    /// Forces a token refresh.
    pub async fn refresh(&self) -> CloudResult<IssuedToken> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Must be called with `refresh_lock` held.
    async fn fetch_and_store(&self) -> CloudResult<IssuedToken> {
        let token = self.api.get_tmp_token().await.map_err(|e| {
            warn!("temporary token refresh failed: {e}");
            e
        })?;

        debug!("refreshed temporary token, expires at {}", token.expires_at());

        let mut state = self.state.write().await;
        state.generation += 1;
        state.token = Some(token.clone());

        Ok(IssuedToken {
            token,
            generation: state.generation,
        })
    }

    /// Clears the cached token.
    pub async fn clear(&self) {
        self.state.write().await.token = None;
    }

    /// Returns true if a token is cached and outside the refresh margin.
    pub async fn has_valid_token(&self) -> bool {
        let state = self.state.read().await;
        state
            .token
            .as_ref()
            .is_some_and(|t| !t.expires_within_secs(self.refresh_margin_secs))
    }

    /// Number of successful refreshes so far.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }
}

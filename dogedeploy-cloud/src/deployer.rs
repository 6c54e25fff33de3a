//! Deploy orchestrator.
//!
//! Runs one deploy in strict phase order:
//! - enumerate local files
//! - prepare the store (credential exchange)
//! - snapshot remote keys (only when cleanup is enabled)
//! - upload under the concurrency cap
//! - delete remote-only keys from the snapshot
//!
//! The snapshot is taken before any upload so cleanup never mistakes a key
//! written by this run for a stale one.
//!
//! Per-file upload and delete failures end up in `DeployResult::failed_keys`
//! and a failed listing only disables cleanup. Anything else, notably a
//! rejected token exchange, fails the deploy.

use crate::config::SyncConfig;
use crate::enumerate::enumerate_files;
use crate::error::{CloudError, CloudResult};
use crate::keys::deployment_url;
use crate::object_store::ObjectStore;
use crate::progress::{DeployProgress, ProgressCallback, emit, format_bytes, format_duration};
use crate::reconcile::Reconciler;
use crate::retry::RetryPolicy;
use crate::types::{DeployOptions, DeployResult, FileRecord};
use crate::upload::UploadScheduler;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Drives a deploy against one object store.
pub struct Deployer {
    store: Arc<dyn ObjectStore>,
    config: SyncConfig,
    cdn_domain: String,
    on_progress: Option<ProgressCallback>,
}

impl Deployer {
    pub fn new(store: Arc<dyn ObjectStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            cdn_domain: crate::config::CloudConfig::default().cdn_domain,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_cdn_domain(mut self, cdn_domain: impl Into<String>) -> Self {
        self.cdn_domain = cdn_domain.into();
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Deploys `options.local_path` to `options.remote_root_path`.
    ///
    /// Fails on precondition, enumeration and credential errors; per-file
    /// failures are reported in `DeployResult::failed_keys`.
    pub async fn deploy(&self, options: &DeployOptions) -> CloudResult<DeployResult> {
        let started = Instant::now();
        self.config.validate()?;

        let concurrency = options.max_concurrency.unwrap_or(self.config.max_concurrency);
        if concurrency == 0 {
            return Err(CloudError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        let files = self.enumerate(options).await?;
        let total_bytes: u64 = files.iter().map(|f| f.size).sum();
        info!(
            "found {} files to upload, total size {}",
            files.len(),
            format_bytes(total_bytes)
        );
        emit(
            self.on_progress.as_ref(),
            DeployProgress::FilesDiscovered {
                count: files.len(),
                total_bytes,
            },
        );

        self.store.prepare().await.inspect_err(|e| {
            error!("failed to prepare bucket {}: {e}", self.store.bucket_name());
        })?;

        let snapshot = if options.delete_removed {
            self.snapshot_remote().await?
        } else {
            None
        };

        info!("starting upload, max concurrency {concurrency}");
        let failed_uploads = UploadScheduler::new(
            self.store.as_ref(),
            RetryPolicy::from_config(&self.config),
        )
        .with_progress(self.on_progress.as_ref())
        .run(&files, concurrency)
        .await?;

        let mut failed_deletes = Vec::new();
        let mut deleted_count = 0;
        if let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) {
            info!("cleaning up remote files missing locally");
            let local_keys: Vec<&str> = files.iter().map(|f| f.remote_key.as_str()).collect();
            let report = Reconciler::new(self.store.as_ref(), &self.config)
                .with_progress(self.on_progress.as_ref())
                .reconcile(&local_keys, &snapshot)
                .await?;
            deleted_count = report.deleted;
            failed_deletes = report.failed_keys;
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let uploaded_count = files.len() - failed_uploads.len();
        let mut failed_keys = failed_uploads;
        failed_keys.extend(failed_deletes);

        let result = DeployResult {
            uploaded_count,
            total_files: files.len(),
            deployment_url: deployment_url(
                self.store.bucket_name(),
                &self.cdn_domain,
                &options.remote_root_path,
            ),
            total_bytes,
            duration_ms,
            deleted_count,
            failed_keys,
        };

        log_summary(&result);
        Ok(result)
    }

    async fn enumerate(&self, options: &DeployOptions) -> CloudResult<Vec<FileRecord>> {
        let root = options.local_path.clone();
        let remote_root = options.remote_root_path.clone();
        tokio::task::spawn_blocking(move || enumerate_files(&root, &remote_root))
            .await
            .map_err(|e| CloudError::Walk(format!("enumeration task failed: {e}")))?
    }

    /// Lists remote keys. A listing failure disables cleanup for this run;
    /// any other error is returned.
    async fn snapshot_remote(&self) -> CloudResult<Option<Vec<String>>> {
        info!("listing remote files before upload");
        match self.store.list_all_keys().await {
            Ok(keys) => {
                info!("remote bucket currently holds {} files", keys.len());
                emit(
                    self.on_progress.as_ref(),
                    DeployProgress::RemoteSnapshot { count: keys.len() },
                );
                Ok(Some(keys))
            }
            Err(e @ CloudError::List(_)) => {
                warn!("failed to list remote files, skipping cleanup: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn log_summary(result: &DeployResult) {
    info!("deploy summary:");
    info!("  duration: {}", format_duration(result.duration_ms));
    info!(
        "  uploaded: {}/{} files",
        result.uploaded_count, result.total_files
    );
    info!("  total size: {}", format_bytes(result.total_bytes));
    if result.deleted_count > 0 {
        info!("  deleted: {} remote files", result.deleted_count);
    }
    info!("  url: {}", result.deployment_url);

    if !result.failed_keys.is_empty() {
        warn!("failed operations: {}", result.failed_keys.len());
        for key in &result.failed_keys {
            warn!("   - {key}");
        }
    }
}

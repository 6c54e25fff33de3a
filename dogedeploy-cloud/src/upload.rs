//! Bounded-concurrency uploads with per-file retry.
//!
//! Every file future first takes a permit from a semaphore sized to the
//! concurrency limit, so at most that many puts are ever in flight. Files
//! are admitted in FIFO order. One file exhausting its attempts never
//! affects the others. A credential or configuration failure stops the
//! whole batch instead, since every remaining put would fail the same way.

use crate::error::{CloudError, CloudResult};
use crate::object_store::{ByteStream, ObjectStore};
use crate::progress::{DeployProgress, ProgressCallback, emit, percentage};
use crate::retry::RetryPolicy;
use crate::types::FileRecord;
use backon::Retryable;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Runs uploads for an enumerated file list.
pub struct UploadScheduler<'a> {
    store: &'a dyn ObjectStore,
    retry: RetryPolicy,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> UploadScheduler<'a> {
    pub fn new(store: &'a dyn ObjectStore, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Uploads `files` with at most `concurrency_limit` puts in flight.
    ///
    /// Returns the keys that failed every attempt, in enumeration order.
    /// Errors for which [`CloudError::aborts_run`] holds are returned as-is
    /// and cancel the uploads still in flight.
    pub async fn run(
        &self,
        files: &[FileRecord],
        concurrency_limit: usize,
    ) -> CloudResult<Vec<String>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let limit = concurrency_limit.clamp(1, files.len());
        let semaphore = Semaphore::new(limit);
        let total = files.len();

        let mut in_flight: FuturesUnordered<_> = files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let semaphore = &semaphore;
                async move {
                    let outcome = match semaphore.acquire().await {
                        Ok(_permit) => self.upload_with_retry(file).await,
                        Err(_) => Err(CloudError::Upload {
                            key: file.remote_key.clone(),
                            message: "semaphore closed unexpectedly".to_string(),
                        }),
                    };
                    (index, outcome)
                }
            })
            .collect();

        let mut failed = Vec::new();
        let mut completed = 0usize;

        while let Some((index, outcome)) = in_flight.next().await {
            completed += 1;
            let file = &files[index];
            let ok = outcome.is_ok();

            if let Err(e) = outcome {
                if e.aborts_run() {
                    error!("aborting uploads after {}: {e}", file.remote_key);
                    return Err(e);
                }
                error!("upload failed: {} - {e}", file.remote_key);
                failed.push(index);
            }

            let pct = percentage(completed, total);
            info!("upload progress: {completed}/{total} ({pct}%)");
            emit(
                self.on_progress,
                DeployProgress::UploadFinished {
                    key: file.remote_key.clone(),
                    ok,
                    completed,
                    total,
                    percentage: pct,
                },
            );
        }

        failed.sort_unstable();
        Ok(failed
            .into_iter()
            .map(|i| files[i].remote_key.clone())
            .collect())
    }

    /// One file: stream from disk and put, retrying with exponential backoff.
    /// Each attempt reopens the file as a fresh stream.
    async fn upload_with_retry(&self, file: &FileRecord) -> CloudResult<()> {
        let max_attempts = self.retry.max_attempts;
        let attempt = AtomicU32::new(0);
        let attempt = &attempt;
        let store = self.store;

        let op = move || async move {
            let n = attempt.fetch_add(1, Ordering::SeqCst) + 1;
            info!("uploading ({n}/{max_attempts}): {}", file.remote_key);

            let body = ByteStream::from_path(&file.local_path)
                .await
                .map_err(|e| CloudError::Upload {
                    key: file.remote_key.clone(),
                    message: format!("failed to read {}: {e}", file.local_path.display()),
                })?;

            store
                .put(&file.remote_key, body, file.content_type)
                .await
                .map(|_| ())
        };

        op.retry(self.retry.into_backoff())
            .when(|err: &CloudError| !err.aborts_run())
            .notify(|err: &CloudError, dur| {
                let n = attempt.load(Ordering::SeqCst);
                warn!(
                    "upload attempt {n}/{max_attempts} failed for {}: {err}; retrying in {}ms",
                    file.remote_key,
                    dur.as_millis()
                );
                emit(
                    self.on_progress,
                    DeployProgress::UploadRetry {
                        key: file.remote_key.clone(),
                        attempt: n,
                        max_attempts,
                        delay_ms: dur.as_millis() as u64,
                        error: err.to_string(),
                    },
                );
            })
            .await?;

        info!("uploaded: {}", file.remote_key);
        Ok(())
    }
}

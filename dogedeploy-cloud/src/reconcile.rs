//! Remote cleanup: delete objects that no longer exist locally.
//!
//! The plan compares the pre-upload remote snapshot with the local key set
//! after normalizing both (see [`normalize_key`]). Deletes run in sequential
//! chunks of at most three, one attempt each. A credential failure ends the
//! phase after the current chunk settles.

use crate::config::{MassDeletePolicy, SyncConfig};
use crate::error::CloudResult;
use crate::keys::normalize_key;
use crate::object_store::ObjectStore;
use crate::progress::{DeployProgress, ProgressCallback, emit};
use crate::types::ReconcileReport;
use std::collections::HashSet;
use tracing::{error, info, warn};

const PREVIEW_LOCAL: usize = 5;
const PREVIEW_DELETE: usize = 10;

/// Keys selected for deletion and how much of the snapshot they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    /// Remote keys exactly as listed, in snapshot order.
    pub keys: Vec<String>,
    pub snapshot_len: usize,
}

impl DeletePlan {
    /// Fraction of the snapshot scheduled for deletion.
    pub fn ratio(&self) -> f64 {
        if self.snapshot_len == 0 {
            0.0
        } else {
            self.keys.len() as f64 / self.snapshot_len as f64
        }
    }

    pub fn exceeds(&self, threshold: f64) -> bool {
        self.ratio() > threshold
    }
}

/// Computes the remote keys absent from `local_keys`.
pub fn plan_deletions<'k, I>(local_keys: I, remote_snapshot: &[String]) -> DeletePlan
where
    I: IntoIterator<Item = &'k str>,
{
    let local: HashSet<String> = local_keys.into_iter().map(normalize_key).collect();

    let keys = remote_snapshot
        .iter()
        .filter(|remote| !local.contains(&normalize_key(remote)))
        .cloned()
        .collect();

    DeletePlan {
        keys,
        snapshot_len: remote_snapshot.len(),
    }
}

/// Executes a delete plan under the mass-deletion policy.
pub struct Reconciler<'a> {
    store: &'a dyn ObjectStore,
    config: &'a SyncConfig,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a SyncConfig) -> Self {
        Self {
            store,
            config,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Plans and runs cleanup of `remote_snapshot` against `local_keys`.
    pub async fn reconcile(
        &self,
        local_keys: &[&str],
        remote_snapshot: &[String],
    ) -> CloudResult<ReconcileReport> {
        info!("local files map to {} remote keys", local_keys.len());
        for key in local_keys.iter().take(PREVIEW_LOCAL) {
            info!("   - {}", normalize_key(key));
        }
        if local_keys.len() > PREVIEW_LOCAL {
            info!("   ... and {} more", local_keys.len() - PREVIEW_LOCAL);
        }

        let plan = plan_deletions(local_keys.iter().copied(), remote_snapshot);
        let mut report = ReconcileReport {
            planned: plan.keys.clone(),
            ..ReconcileReport::default()
        };

        if plan.keys.is_empty() {
            info!("no remote files need deleting");
            return Ok(report);
        }

        info!("{} remote files scheduled for deletion", plan.keys.len());
        emit(
            self.on_progress,
            DeployProgress::DeletionPlanned {
                count: plan.keys.len(),
                snapshot: plan.snapshot_len,
            },
        );

        if plan.exceeds(self.config.mass_delete_ratio) {
            report.mass_delete_flagged = true;
            warn!(
                "about to delete {}% of remote files; check that the remote path is correct",
                (plan.ratio() * 100.0).round()
            );
            if self.config.mass_delete_policy == MassDeletePolicy::Abort {
                error!(
                    "mass deletion blocked by policy; skipping {} deletes",
                    plan.keys.len()
                );
                report.aborted = true;
                return Ok(report);
            }
        }

        for key in plan.keys.iter().take(PREVIEW_DELETE) {
            info!("   - {key}");
        }
        if plan.keys.len() > PREVIEW_DELETE {
            info!("   ... and {} more", plan.keys.len() - PREVIEW_DELETE);
        }

        report.failed_keys = self.delete_all(&plan.keys).await?;
        report.deleted = plan.keys.len() - report.failed_keys.len();
        Ok(report)
    }

    /// Deletes `keys` in chunks of `delete_concurrency()`; a chunk starts
    /// only after the previous one has fully settled.
    pub async fn delete_all(&self, keys: &[String]) -> CloudResult<Vec<String>> {
        let chunk_size = self.config.delete_concurrency();
        let mut failed = Vec::new();

        for chunk in keys.chunks(chunk_size) {
            let results = futures::future::join_all(chunk.iter().map(|key| async move {
                info!("deleting remote file: {key}");
                (key, self.store.delete(key).await)
            }))
            .await;

            let mut fatal = None;
            for (key, result) in results {
                let ok = result.is_ok();
                if let Err(e) = result {
                    error!("delete failed: {key} - {e}");
                    failed.push(key.clone());
                    if e.aborts_run() && fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                emit(
                    self.on_progress,
                    DeployProgress::DeleteFinished {
                        key: key.clone(),
                        ok,
                    },
                );
            }

            if let Some(e) = fatal {
                error!("aborting cleanup: {e}");
                return Err(e);
            }
        }

        Ok(failed)
    }
}

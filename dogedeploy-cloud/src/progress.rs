//! Progress reporting for deploy runs.
//!
//! Progress reaches callers two ways: structured [`DeployProgress`] events
//! sent to an optional callback, and the `tracing` log stream. The engine
//! never writes to stdout or stderr itself; rendering the log is up to the
//! subscriber the caller installs.

/// Progress events emitted during a deploy.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DeployProgress {
    /// Local enumeration finished.
    FilesDiscovered { count: usize, total_bytes: u64 },

    /// Remote snapshot taken before uploading.
    RemoteSnapshot { count: usize },

    /// One upload attempt failed and will be retried after `delay_ms`.
    UploadRetry {
        key: String,
        attempt: u32,
        max_attempts: u32,
        delay_ms: u64,
        error: String,
    },

    /// A file reached a terminal outcome.
    UploadFinished {
        key: String,
        ok: bool,
        completed: usize,
        total: usize,
        percentage: u8,
    },

    /// Reconciliation selected keys for deletion.
    DeletionPlanned { count: usize, snapshot: usize },

    /// One delete finished.
    DeleteFinished { key: String, ok: bool },
}

/// Callback for progress updates during a deploy.
pub type ProgressCallback = Box<dyn Fn(DeployProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: DeployProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

/// Whole-number percentage of `completed` over `total`, rounded.
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Human-readable byte count: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Human-readable duration: `42s` or `3m 5s`.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

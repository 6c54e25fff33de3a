//! Local file discovery.
//!
//! Walks a directory (or accepts a single file) and produces one
//! [`FileRecord`] per regular file. Symlinks are followed, matching what a
//! plain `stat` on the host would report.

use crate::error::{CloudError, CloudResult};
use crate::keys::join_key;
use crate::mime::content_type_for;
use crate::types::FileRecord;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Enumerates every regular file under `root`, keyed under `remote_root`.
///
/// Records come back sorted by local path so runs are reproducible.
pub fn enumerate_files(root: &Path, remote_root: &str) -> CloudResult<Vec<FileRecord>> {
    let meta = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CloudError::NotFound(root.to_path_buf()),
        _ => CloudError::Io(e),
    })?;

    if meta.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CloudError::Walk(format!("{} has no file name", root.display())))?;
        return Ok(vec![FileRecord {
            local_path: root.to_path_buf(),
            remote_key: join_key(remote_root, &name),
            size: meta.len(),
            content_type: content_type_for(root),
        }]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CloudError::Walk(format!("{}: {e}", entry.path().display())))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(FileRecord {
            local_path: entry.path().to_path_buf(),
            remote_key: join_key(remote_root, &relative),
            size: entry.metadata()?.len(),
            content_type: content_type_for(entry.path()),
        });
    }

    debug!("enumerated {} files under {}", files.len(), root.display());
    Ok(files)
}

//! Turns a build directory into a path-to-content map.

use crate::error::{SyncError, SyncResult};
use crate::PathContentMap;
use bytes::Bytes;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Reads every regular file under `root`.
///
/// Keys are the file's path relative to `root`, `/`-separated with a
/// leading `/` (`root/css/site.css` becomes `/css/site.css`). A symlink to
/// a file is read through and keyed by the link's own path; symlinked
/// directories are not followed.
pub fn scan_directory(root: &Path) -> SyncResult<PathContentMap> {
    let mut items = PathContentMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            SyncError::Io {
                path,
                source: e.into(),
            }
        })?;
        let is_file = if entry.path_is_symlink() {
            std::fs::metadata(entry.path())
                .map_err(|source| SyncError::Io {
                    path: entry.path().to_path_buf(),
                    source,
                })?
                .is_file()
        } else {
            entry.file_type().is_file()
        };
        if !is_file {
            continue;
        }

        let content = std::fs::read(entry.path()).map_err(|source| SyncError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        items.insert(object_path(root, entry.path()), Some(Bytes::from(content)));
    }

    debug!("scanned {} files under {}", items.len(), root.display());
    Ok(items)
}

/// `/`-rooted object path for `file` relative to `root`.
fn object_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

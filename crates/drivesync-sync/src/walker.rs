//! Local source enumeration
//!
//! Walks the source tree with `tokio::fs`, visiting entries in lexical
//! order. Only regular files are reported. Symbolic links are never
//! followed, which also rules out cycles.

use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::pin::Pin;

use drivesync_core::domain::{LocalFile, SyncPath};
use tracing::{debug, instrument, warn};

use crate::SyncError;

/// Returns every regular file under `root`, in lexical path order
///
/// The root itself is resolved with `canonicalize`, so a symlinked root is
/// accepted; links below it are skipped.
///
/// # Errors
/// Fails if `root` is missing or not a directory, or if any directory in
/// the tree cannot be read. A partial walk is never returned.
#[instrument]
pub async fn walk_local_files(root: &Path) -> Result<Vec<LocalFile>, SyncError> {
    let canonical = match tokio::fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SyncError::PathNotFound(root.to_path_buf()))
        }
        Err(source) => {
            return Err(SyncError::ReadDir {
                path: root.to_path_buf(),
                source,
            })
        }
    };

    if !tokio::fs::metadata(&canonical).await?.is_dir() {
        return Err(SyncError::NotADirectory(root.to_path_buf()));
    }

    let root = SyncPath::new(canonical)?;
    let mut files = Vec::new();
    walk_directory(&root, &root, &mut files).await?;

    debug!(root = %root, count = files.len(), "Local walk complete");
    Ok(files)
}

/// Recursively collects regular files under `dir`
fn walk_directory<'a>(
    dir: &'a SyncPath,
    root: &'a SyncPath,
    files: &'a mut Vec<LocalFile>,
) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + 'a>> {
    Box::pin(async move {
        let read_err = |source| SyncError::ReadDir {
            path: dir.as_path().to_path_buf(),
            source,
        };

        let mut reader = tokio::fs::read_dir(dir.as_path()).await.map_err(read_err)?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(read_err)? {
            entries.push(entry);
        }
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            // file_type() does not follow symlinks
            let file_type = entry.file_type().await.map_err(read_err)?;
            let path = SyncPath::new(entry.path())?;

            if file_type.is_dir() {
                walk_directory(&path, root, files).await?;
            } else if file_type.is_file() {
                match LocalFile::new(path, root) {
                    Ok(file) => files.push(file),
                    Err(err) => warn!(path = ?entry.path(), %err, "Skipping file"),
                }
            } else {
                debug!(path = ?entry.path(), "Skipping non-regular entry");
            }
        }

        Ok(())
    })
}

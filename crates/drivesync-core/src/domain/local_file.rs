//! Local file records produced by the directory walk

use std::path::Path;

use super::errors::DomainError;
use super::sync_path::SyncPath;

/// A regular file found under the sync source
///
/// `relative_name` is the path relative to the source root with `/`
/// separators, used for logging and error reports. Content is not captured
/// here; the uploader reads it from [`LocalFile::path`] when the transfer
/// starts. The remote object is
/// named after the final component only (see [`LocalFile::remote_name`]),
/// so every file lands directly in the destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    relative_name: String,
    path: SyncPath,
}

impl LocalFile {
    /// Builds a record for `path`, which must lie within `root`
    ///
    /// # Errors
    /// Returns an error if the path is outside `root`, has no file name,
    /// or is not valid UTF-8 (Drive names are strings).
    pub fn new(path: SyncPath, root: &SyncPath) -> Result<Self, DomainError> {
        let relative = path.relative_to(root)?;
        let relative_name = relative_name_of(&relative)?;

        if path.file_name().is_none() {
            return Err(DomainError::InvalidPath(format!(
                "Path has no UTF-8 file name: {path}"
            )));
        }

        Ok(Self {
            relative_name,
            path,
        })
    }

    /// Path relative to the sync source, `/`-separated
    #[must_use]
    pub fn relative_name(&self) -> &str {
        &self.relative_name
    }

    /// Absolute path on disk
    #[must_use]
    pub fn path(&self) -> &SyncPath {
        &self.path
    }

    /// The name the remote object is created under and matched by
    #[must_use]
    pub fn remote_name(&self) -> &str {
        // Checked non-empty in `new`.
        self.path.file_name().unwrap_or(&self.relative_name)
    }
}

fn relative_name_of(relative: &Path) -> Result<String, DomainError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            DomainError::InvalidPath(format!("Non UTF-8 path: {}", relative.display()))
        })?;
        parts.push(part);
    }

    if parts.is_empty() {
        return Err(DomainError::InvalidPath(
            "File path equals the sync root".to_string(),
        ));
    }

    Ok(parts.join("/"))
}

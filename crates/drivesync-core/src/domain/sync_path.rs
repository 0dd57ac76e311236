//! Absolute local paths

use std::fmt;
use std::path::{Component, Path, PathBuf};

use super::errors::DomainError;

/// An absolute, lexically normalized local path
///
/// `.` segments are dropped and `..` segments are folded into their parent
/// without touching the filesystem. Symlinks are left alone; the walker
/// never follows them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncPath(PathBuf);

impl SyncPath {
    /// # Errors
    /// Returns [`DomainError::InvalidPath`] for a relative path or one whose
    /// `..` segments climb above the filesystem root.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(DomainError::InvalidPath(format!(
                "{} is not absolute",
                path.display()
            )));
        }
        lexical_normalize(&path).map(Self).ok_or_else(|| {
            DomainError::InvalidPath(format!("{} climbs above /", path.display()))
        })
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Final component, when it is valid UTF-8
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()?.to_str()
    }

    /// The part of this path below `root`
    ///
    /// # Errors
    /// Returns [`DomainError::PathNotInSyncRoot`] when `root` is not an
    /// ancestor of this path. Comparison is per component, so `/data/a`
    /// is not under `/data/ab`.
    pub fn relative_to(&self, root: &SyncPath) -> Result<PathBuf, DomainError> {
        match self.0.strip_prefix(&root.0) {
            Ok(rest) => Ok(rest.to_path_buf()),
            Err(_) => Err(DomainError::PathNotInSyncRoot(format!(
                "{self} is outside {root}"
            ))),
        }
    }
}

/// Folds `.` and `..` away; `None` when `..` runs past the root
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/` has nothing above it.
                if out.parent().is_none() {
                    return None;
                }
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

impl fmt::Display for SyncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for SyncPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

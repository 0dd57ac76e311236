//! drivesync Sync - Local walk and concurrent upload engine
//!
//! Provides:
//! - A deterministic walk of the local source tree
//! - One listing of the destination folder per run
//! - Concurrent per-file create-or-update against an [`IRemoteStore`](drivesync_core::ports::IRemoteStore)
//!
//! ## Modules
//!
//! - [`engine`] - Plans and runs the upload batch
//! - [`walker`] - Recursive local file enumeration

pub mod engine;
pub mod walker;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a synchronization run
///
/// Per-file failures are not represented here; they are collected in
/// [`SyncResult::errors`](engine::SyncResult::errors) and the batch continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A directory under the source could not be read
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        /// Directory being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The source path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The destination folder could not be listed
    #[error("Remote listing failed: {0}")]
    Remote(String),

    /// A domain-level error propagated from drivesync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] drivesync_core::domain::DomainError),
}

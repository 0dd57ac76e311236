//! Remote object store port (driven/secondary port)
//!
//! The interface the sync engine uses to reach the remote folder. The
//! production implementation targets the Google Drive v3 API, but nothing
//! here is Drive-specific.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; adapters attach their own typed error as the source.
//! - Uploads take the path of the local file rather than its bytes, so an
//!   implementation can stream the content instead of buffering it.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RemoteId;

/// One object in the remote folder
///
/// Port-level DTO; the sync engine only needs the id and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Provider-specific object identifier
    pub id: RemoteId,
    /// Object name within its folder
    pub name: String,
    /// Content size in bytes (None when the provider omits it)
    pub size: Option<u64>,
    /// Last modification time reported by the provider
    pub modified: Option<DateTime<Utc>>,
}

/// Port trait for remote object store operations
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists every non-trashed object whose parent is `folder`
    ///
    /// Implementations follow pagination until the listing is complete.
    async fn list_folder(&self, folder: &RemoteId) -> anyhow::Result<Vec<RemoteFile>>;

    /// Creates a new object named `name` in `folder` with the content of `source`
    async fn create_file(
        &self,
        folder: &RemoteId,
        name: &str,
        source: &Path,
    ) -> anyhow::Result<RemoteFile>;

    /// Replaces the content of the existing object `id` with `source`
    async fn update_file(&self, id: &RemoteId, source: &Path) -> anyhow::Result<RemoteFile>;
}

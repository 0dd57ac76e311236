//! Sync engine
//!
//! One run of the engine:
//!
//! 1. Lists the destination folder once and indexes it by name.
//! 2. Walks the local source once.
//! 3. Spawns one task per local file that streams it to the store, either
//!    creating a new remote object or updating the matched one.
//! 4. Waits for every task before returning.
//!
//! Failures in steps 1 and 2 abort the run. Failures inside a task are
//! recorded in [`SyncResult::errors`] and do not affect other tasks.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use drivesync_core::domain::{LocalFile, RemoteId, RemoteIndex, UpsertAction};
use drivesync_core::ports::{IRemoteStore, ISyncObserver, NoopObserver};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::walker::walk_local_files;
use crate::SyncError;

// ============================================================================
// Results
// ============================================================================

/// One local file and what will be done with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    /// The local file
    pub file: LocalFile,
    /// Create or update
    pub action: UpsertAction,
}

/// A per-file failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    /// Relative name of the file, or `<unknown>` if its task panicked
    pub name: String,
    /// Error chain, outermost first
    pub message: String,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Summary of a completed synchronization run
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Number of remote objects created
    pub files_created: u32,
    /// Number of remote objects updated
    pub files_updated: u32,
    /// Errors encountered during the run (non-fatal)
    pub errors: Vec<FileError>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl SyncResult {
    /// True when every file was transferred
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What a finished upload task hands back
struct TaskOutcome {
    name: String,
    action: UpsertAction,
    result: Result<(), String>,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way local-to-remote synchronizer
pub struct SyncEngine {
    store: Arc<dyn IRemoteStore>,
    folder_id: RemoteId,
    source: PathBuf,
    max_concurrent: usize,
    observer: Arc<dyn ISyncObserver>,
}

impl SyncEngine {
    /// Creates an engine that mirrors `source` into `folder_id`
    ///
    /// Uploads are unbounded and progress is not reported until
    /// [`with_max_concurrent`](Self::with_max_concurrent) and
    /// [`with_observer`](Self::with_observer) say otherwise.
    pub fn new(store: Arc<dyn IRemoteStore>, folder_id: RemoteId, source: impl Into<PathBuf>) -> Self {
        Self {
            store,
            folder_id,
            source: source.into(),
            max_concurrent: 0,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Caps the number of uploads in flight; 0 means unbounded
    ///
    /// Values above [`Semaphore::MAX_PERMITS`] are lowered to it.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.min(Semaphore::MAX_PERMITS);
        self
    }

    /// Sets the progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ISyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Lists the destination, walks the source and pairs each file with its action
    ///
    /// Nothing is uploaded. [`sync`](Self::sync) runs exactly this plan.
    ///
    /// # Errors
    /// Returns an error if the listing or the walk fails.
    #[tracing::instrument(skip(self), fields(folder = %self.folder_id, source = %self.source.display()))]
    pub async fn plan(&self) -> Result<Vec<PlannedUpload>, SyncError> {
        let listing = self
            .store
            .list_folder(&self.folder_id)
            .await
            .map_err(|e| SyncError::Remote(format!("{e:#}")))?;

        let index = RemoteIndex::from_files(listing);
        if index.duplicates() > 0 {
            warn!(
                duplicates = index.duplicates(),
                "Destination folder has duplicate names; the first listed object is used"
            );
        }
        debug!(remote_names = index.len(), "Indexed destination folder");

        let files = walk_local_files(&self.source).await?;

        let plan: Vec<PlannedUpload> = files
            .into_iter()
            .map(|file| {
                let action = index.plan(&file);
                PlannedUpload { file, action }
            })
            .collect();

        for (remote_name, files) in name_collisions(&plan) {
            warn!(
                remote_name,
                files = ?files,
                "Local files share a remote name and will overwrite or duplicate each other"
            );
        }

        info!(files = plan.len(), "Planned uploads");
        Ok(plan)
    }

    /// Runs the plan, one task per file, and waits for all of them
    ///
    /// # Errors
    /// Returns an error only if planning fails. Per-file errors are in the
    /// returned [`SyncResult`].
    #[tracing::instrument(skip(self), fields(folder = %self.folder_id))]
    pub async fn sync(&self) -> Result<SyncResult, SyncError> {
        let start = Instant::now();
        let plan = self.plan().await?;

        let semaphore = (self.max_concurrent > 0).then(|| Arc::new(Semaphore::new(self.max_concurrent)));
        let mut tasks = JoinSet::new();

        for PlannedUpload { file, action } in plan {
            let store = Arc::clone(&self.store);
            let observer = Arc::clone(&self.observer);
            let folder = self.folder_id.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = match semaphore {
                    Some(s) => s.acquire_owned().await.ok(),
                    None => None,
                };

                let name = file.relative_name().to_string();
                observer.on_transfer_started(&name, &action);

                let result = upload_one(store.as_ref(), &folder, &file, &action)
                    .await
                    .map_err(|e| format!("{e:#}"));

                match &result {
                    Ok(()) => observer.on_transfer_finished(&name, &action),
                    Err(message) => observer.on_transfer_failed(&name, message),
                }

                TaskOutcome { name, action, result }
            });
        }

        let mut result = SyncResult::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome {
                    action,
                    result: Ok(()),
                    ..
                }) => match action {
                    UpsertAction::Create => result.files_created += 1,
                    UpsertAction::Update(_) => result.files_updated += 1,
                },
                Ok(TaskOutcome {
                    name,
                    result: Err(message),
                    ..
                }) => {
                    warn!(file = %name, error = %message, "Upload failed");
                    result.errors.push(FileError { name, message });
                }
                Err(join_error) => {
                    error!(error = %join_error, "Upload task did not complete");
                    result.errors.push(FileError {
                        name: "<unknown>".to_string(),
                        message: join_error.to_string(),
                    });
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            created = result.files_created,
            updated = result.files_updated,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Sync finished"
        );
        Ok(result)
    }
}

/// Remote names claimed by more than one local file, with those files
///
/// The destination folder is flat, so `a/x.txt` and `b/x.txt` both land on
/// `x.txt`.
fn name_collisions(plan: &[PlannedUpload]) -> Vec<(&str, Vec<&str>)> {
    let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for planned in plan {
        by_name
            .entry(planned.file.remote_name())
            .or_default()
            .push(planned.file.relative_name());
    }
    by_name
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .collect()
}

/// Sends `file` to the store, which reads it from disk
async fn upload_one(
    store: &dyn IRemoteStore,
    folder: &RemoteId,
    file: &LocalFile,
    action: &UpsertAction,
) -> anyhow::Result<()> {
    let source = file.path().as_path();
    match action {
        UpsertAction::Create => {
            debug!(name = file.remote_name(), "Creating remote file");
            store.create_file(folder, file.remote_name(), source).await?;
        }
        UpsertAction::Update(id) => {
            debug!(name = file.remote_name(), id = %id, "Updating remote file");
            store.update_file(id, source).await?;
        }
    }

    Ok(())
}

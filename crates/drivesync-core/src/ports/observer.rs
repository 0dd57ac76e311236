//! Sync progress port
//!
//! Callbacks are synchronous and may be invoked from several upload tasks
//! at once, so implementations must be thread-safe.

use crate::domain::UpsertAction;

/// Receives per-file progress from the sync engine
pub trait ISyncObserver: Send + Sync {
    /// A transfer for `name` is about to start
    fn on_transfer_started(&self, name: &str, action: &UpsertAction);

    /// The transfer for `name` completed
    fn on_transfer_finished(&self, name: &str, action: &UpsertAction);

    /// The transfer for `name` failed; the batch continues
    fn on_transfer_failed(&self, name: &str, error: &str);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ISyncObserver for NoopObserver {
    fn on_transfer_started(&self, _name: &str, _action: &UpsertAction) {}
    fn on_transfer_finished(&self, _name: &str, _action: &UpsertAction) {}
    fn on_transfer_failed(&self, _name: &str, _error: &str) {}
}

//! Name index over one listing of the destination folder
//!
//! The index is built once per run, before any upload starts, and decides
//! for every local file whether the remote side gets a create or an update.

use std::collections::HashMap;

use super::local_file::LocalFile;
use super::remote_id::RemoteId;
use crate::ports::RemoteFile;

/// What the engine does with one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertAction {
    /// No remote object with this name exists yet
    Create,
    /// Replace the content of the existing remote object
    Update(RemoteId),
}

impl UpsertAction {
    /// Short verb used in logs and JSON output
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertAction::Create => "create",
            UpsertAction::Update(_) => "update",
        }
    }
}

impl std::fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote object names mapped to their ids
///
/// Matching is exact and case-sensitive. When the folder holds several
/// objects with the same name, the first one in listing order wins.
#[derive(Debug, Clone, Default)]
pub struct RemoteIndex {
    by_name: HashMap<String, RemoteId>,
    duplicates: usize,
}

impl RemoteIndex {
    /// Builds the index from one folder listing, in listing order
    pub fn from_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = RemoteFile>,
    {
        let mut index = Self::default();
        for file in files {
            if index.by_name.contains_key(&file.name) {
                index.duplicates += 1;
                continue;
            }
            index.by_name.insert(file.name, file.id);
        }
        index
    }

    /// Id of the remote object named `name`, if any
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&RemoteId> {
        self.by_name.get(name)
    }

    /// Decides between create and update for `file`
    #[must_use]
    pub fn plan(&self, file: &LocalFile) -> UpsertAction {
        match self.lookup(file.remote_name()) {
            Some(id) => UpsertAction::Update(id.clone()),
            None => UpsertAction::Create,
        }
    }

    /// Number of distinct names
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when the destination folder had no objects
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Number of listing entries shadowed by an earlier object of the same name
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

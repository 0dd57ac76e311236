//! Domain entities and business logic
//!
//! - Validated Drive identifiers and absolute local paths
//! - Local file records produced by the directory walk
//! - The remote index used to decide between create and update
//! - Domain-specific error types

pub mod errors;
pub mod local_file;
pub mod remote_id;
pub mod remote_index;
pub mod sync_path;

pub use errors::DomainError;
pub use local_file::LocalFile;
pub use remote_id::RemoteId;
pub use remote_index::{RemoteIndex, UpsertAction};
pub use sync_path::SyncPath;

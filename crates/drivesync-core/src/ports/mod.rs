//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the traits the core depends on; their implementations live in
//! adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote object store operations (list, create, update)
//! - [`IAuthProvider`] - Interactive OAuth login and token refresh
//! - [`ITokenStore`] - Persistence of the OAuth token record
//! - [`ISyncObserver`] - Per-file progress reporting

pub mod auth;
pub mod observer;
pub mod remote_store;

pub use auth::{IAuthProvider, ITokenStore, Tokens};
pub use observer::{ISyncObserver, NoopObserver};
pub use remote_store::{IRemoteStore, RemoteFile};

//! drivesync Drive - Google Drive v3 API client
//!
//! Provides async client for:
//! - OAuth2 authentication (Authorization Code with PKCE and a loopback redirect)
//! - Token persistence in a local JSON file
//! - Folder listing, file creation and content update via the Drive v3 REST API
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 flow components
//! - [`client`] - Drive API HTTP client and folder listing
//! - [`provider`] - [`IRemoteStore`](drivesync_core::ports::IRemoteStore) implementation with token refresh
//! - [`token_store`] - Token file storage
//! - [`upload`] - Streamed single-request and resumable uploads

pub mod auth;
pub mod client;
pub mod provider;
pub mod token_store;
pub mod upload;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested file or folder does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; the request is not retried
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Server-suggested wait, when a `Retry-After` header was present
        retry_after: Option<Duration>,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

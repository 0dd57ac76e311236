//! Google Drive API client
//!
//! Provides a typed HTTP client for the Drive v3 REST API. Handles
//! authorization (bearer token or API key), error mapping, JSON
//! deserialization, and endpoint construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivesync_core::domain::RemoteId;
//! use drivesync_drive::client::{Credential, DriveClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new(Credential::Bearer("access-token-here".into()));
//! let folder: RemoteId = "folder_identifier".parse()?;
//! for file in client.list_folder(&folder).await? {
//!     println!("{} {}", file.id, file.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use drivesync_core::{domain::RemoteId, ports::RemoteFile};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::DriveError;

/// Base URL for Google APIs; the Drive and upload paths hang off it
const GOOGLE_API_BASE_URL: &str = "https://www.googleapis.com";

/// Page size for folder listings (the API maximum)
const LIST_PAGE_SIZE: &str = "1000";

/// Partial-response selector for listings
const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, modifiedTime)";

/// Partial-response selector for single-file responses
pub(crate) const FILE_FIELDS: &str = "id, name, size, modifiedTime";

/// Resumable uploads send content in multiples of this many bytes
pub const UPLOAD_CHUNK_ALIGN: usize = 256 * 1024;

/// Default resumable chunk; files up to this size go in a single request
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 32 * UPLOAD_CHUNK_ALIGN;

// ============================================================================
// Drive API response types
// ============================================================================

/// A `File` resource, restricted to the fields we request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveFile {
    /// Drive file ID
    pub(crate) id: String,
    /// File name
    pub(crate) name: String,
    /// Size in bytes; Drive encodes int64 values as strings
    pub(crate) size: Option<String>,
    /// Last modification time
    pub(crate) modified_time: Option<DateTime<Utc>>,
}

impl DriveFile {
    /// Converts into the port-level [`RemoteFile`]
    pub(crate) fn into_remote_file(self) -> Result<RemoteFile, DriveError> {
        let id = RemoteId::new(self.id)
            .map_err(|e| DriveError::InvalidResponse(format!("bad file id: {e}")))?;

        let size = match self.size {
            Some(s) => Some(s.parse::<u64>().map_err(|_| {
                DriveError::InvalidResponse(format!("bad size '{s}' for {}", self.name))
            })?),
            None => None,
        };

        Ok(RemoteFile {
            id,
            name: self.name,
            size,
            modified: self.modified_time,
        })
    }
}

/// Response from `GET /files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Error envelope returned by Google APIs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ============================================================================
// Credential
// ============================================================================

/// How requests are authorized
#[derive(Clone)]
pub enum Credential {
    /// OAuth2 access token sent as `Authorization: Bearer`
    Bearer(String),
    /// API key sent as the `key` query parameter
    ApiKey(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(***)"),
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with authorization and base URL construction.
/// Metadata calls go to `{base}/drive/v3`, content uploads to
/// `{base}/upload/drive/v3`. Cloning is cheap; clones share the connection
/// pool.
#[derive(Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata requests
    api_url: String,
    /// Base URL for content uploads
    upload_url: String,
    /// Current credential
    credential: Credential,
    /// Bytes per resumable upload request
    chunk_size: usize,
}

impl DriveClient {
    /// Creates a new DriveClient against the public Google endpoint
    pub fn new(credential: Credential) -> Self {
        Self::with_base_url(credential, GOOGLE_API_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `credential` - Bearer token or API key
    /// * `base_url` - Origin that serves `/drive/v3` and `/upload/drive/v3`
    pub fn with_base_url(credential: Credential, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/');
        Self {
            client: Client::new(),
            api_url: format!("{base_url}/drive/v3"),
            upload_url: format!("{base_url}/upload/drive/v3"),
            credential,
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }

    /// Sets the resumable upload chunk size
    ///
    /// Rounded down to a multiple of [`UPLOAD_CHUNK_ALIGN`], with one
    /// alignment unit as the floor. Files no larger than one chunk are
    /// uploaded in a single request.
    pub fn with_upload_chunk_size(mut self, chunk_size: usize) -> Self {
        let aligned = chunk_size - chunk_size % UPLOAD_CHUNK_ALIGN;
        self.chunk_size = aligned.max(UPLOAD_CHUNK_ALIGN);
        self
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Replaces the credential (e.g., after a token refresh)
    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
        debug!("Updated DriveClient credential");
    }

    /// Returns a reference to the current credential
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Credential::Bearer(token) => builder.bearer_auth(token),
            Credential::ApiKey(key) => builder.query(&[("key", key.as_str())]),
        }
    }

    /// Creates an authorized request builder for a metadata endpoint
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to `/drive/v3` (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_url, path);
        self.authorize(self.client.request(method, &url))
    }

    /// Creates an authorized request builder for an upload endpoint
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to `/upload/drive/v3`
    pub fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.upload_url, path);
        self.authorize(self.client.request(method, &url))
    }

    /// Request against a resumable session URI handed out by Drive
    pub(crate) fn session_request(&self, session_uri: &str) -> RequestBuilder {
        self.authorize(self.client.put(session_uri))
    }

    /// Lists every non-trashed file whose parent is `folder`
    ///
    /// Follows `nextPageToken` until the listing is exhausted. Entries keep
    /// the order the API returns them in.
    pub async fn list_folder(&self, folder: &RemoteId) -> Result<Vec<RemoteFile>> {
        // RemoteId only admits [A-Za-z0-9_-], so no quoting is needed.
        let query = format!("'{}' in parents and trashed=false", folder.as_str());
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let mut request = self.request(Method::GET, "/files").query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", LIST_PAGE_SIZE),
            ]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(DriveError::from)
                .context("Failed to send list request")?;
            let page: FileListResponse = check_status(response)
                .await
                .with_context(|| format!("Listing folder {folder} failed"))?
                .json()
                .await
                .map_err(DriveError::from)
                .context("Failed to parse list response")?;

            pages += 1;
            debug!(
                page = pages,
                count = page.files.len(),
                "Fetched folder listing page"
            );

            for file in page.files {
                files.push(file.into_remote_file()?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(folder = %folder, total = files.len(), pages, "Folder listing complete");
        Ok(files)
    }
}

// ============================================================================
// Status mapping
// ============================================================================

/// Passes successful responses through and maps failures to [`DriveError`]
pub(crate) async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| format!("HTTP {status}"));

    warn!(status = status.as_u16(), %message, "Drive API request failed");

    Err(match status {
        StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
        StatusCode::FORBIDDEN => DriveError::Forbidden(message),
        StatusCode::NOT_FOUND => DriveError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests { retry_after },
        s if s.is_server_error() => DriveError::ServerError(message),
        _ => DriveError::InvalidResponse(format!("{status}: {message}")),
    })
}

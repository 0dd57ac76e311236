//! Upload operations for the Google Drive v3 API
//!
//! Provides functions for writing file content to Drive:
//! - [`create_file`] - Creates a new file in a folder
//! - [`update_file`] - Replaces the content of an existing file
//!
//! Content is streamed from disk. A file no larger than the client's chunk
//! size (see [`DriveClient::with_upload_chunk_size`]) goes in one request:
//! `multipart/related` for a create, a media `PATCH` for an update. Larger
//! files open a resumable session and are sent one chunk at a time, so at
//! most one chunk is held in memory per transfer.
//!
//! ## Google Drive API References
//!
//! - [Upload file data](https://developers.google.com/drive/api/guides/manage-uploads)
//! - [Resumable upload](https://developers.google.com/drive/api/guides/manage-uploads#resumable)
//! - [files.create](https://developers.google.com/drive/api/reference/rest/v3/files/create)
//! - [files.update](https://developers.google.com/drive/api/reference/rest/v3/files/update)

use std::io::SeekFrom;
use std::path::Path;

use anyhow::{Context, Result};
use drivesync_core::{domain::RemoteId, ports::RemoteFile};
use futures_util::stream::{self, StreamExt};
use hyper::body::Bytes;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use reqwest::{Body, Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use crate::client::{check_status, DriveClient, DriveFile, FILE_FIELDS};
use crate::DriveError;

/// MIME type recorded for uploaded content
const CONTENT_MIME_TYPE: &str = "application/octet-stream";

/// Creates a new file named `name` inside `folder`
///
/// Drive allows several files with the same name in one folder, so calling
/// this for a name that already exists produces a duplicate.
///
/// # Arguments
/// * `client` - The authorized DriveClient
/// * `folder` - Parent folder ID
/// * `name` - Name of the new file
/// * `source` - Local file to read the content from
///
/// # Returns
/// Metadata of the created file
///
/// # Errors
/// Returns an error if `source` cannot be read, a request fails, or the
/// response cannot be parsed
pub async fn create_file(
    client: &DriveClient,
    folder: &RemoteId,
    name: &str,
    source: &Path,
) -> Result<RemoteFile> {
    let (file, size) = open_source(source).await?;
    let metadata = json!({
        "name": name,
        "parents": [folder.as_str()],
        "mimeType": CONTENT_MIME_TYPE,
    });

    if size > client.chunk_size() as u64 {
        debug!(size, name, folder = %folder, "Creating file through a resumable session");
        let request = client.upload_request(Method::POST, "/files").json(&metadata);
        return upload_resumable(client, request, file, size)
            .await
            .with_context(|| format!("Creating {name} failed"));
    }

    debug!("Creating file ({} bytes): {} in folder {}", size, name, folder);

    let boundary = format!("drivesync_{}", Uuid::new_v4().simple());
    let (head, tail) = multipart_frame(&metadata, &boundary);
    let content_length = (head.len() + tail.len()) as u64 + size;
    let parts = stream::iter([Ok::<_, std::io::Error>(Bytes::from(head))])
        .chain(ReaderStream::new(file))
        .chain(stream::iter([Ok(Bytes::from(tail))]));

    let response = client
        .upload_request(Method::POST, "/files")
        .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
        .header(
            CONTENT_TYPE,
            format!("multipart/related; boundary={boundary}"),
        )
        .header(CONTENT_LENGTH, content_length)
        .body(Body::wrap_stream(parts))
        .send()
        .await
        .map_err(DriveError::from)
        .context("Failed to send create request")?;

    let created = parse_file(response)
        .await
        .with_context(|| format!("Creating {name} failed"))?;
    debug!("Create completed: id={}, name={}", created.id, created.name);
    Ok(created)
}

/// Replaces the content of the existing file `file_id`
///
/// The file keeps its ID, name and parents.
///
/// # Arguments
/// * `client` - The authorized DriveClient
/// * `file_id` - ID of the file to overwrite
/// * `source` - Local file to read the new content from
///
/// # Returns
/// Metadata of the updated file
///
/// # Errors
/// Returns an error if `source` cannot be read, a request fails, or the
/// response cannot be parsed
pub async fn update_file(
    client: &DriveClient,
    file_id: &RemoteId,
    source: &Path,
) -> Result<RemoteFile> {
    let (file, size) = open_source(source).await?;
    let path = format!("/files/{}", file_id.as_str());

    if size > client.chunk_size() as u64 {
        debug!(size, id = %file_id, "Updating file through a resumable session");
        let request = client
            .upload_request(Method::PATCH, &path)
            .header(CONTENT_LENGTH, 0u64);
        return upload_resumable(client, request, file, size)
            .await
            .with_context(|| format!("Updating {file_id} failed"));
    }

    debug!("Updating file ({} bytes): {}", size, file_id);

    let response = client
        .upload_request(Method::PATCH, &path)
        .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
        .header(CONTENT_TYPE, CONTENT_MIME_TYPE)
        .header(CONTENT_LENGTH, size)
        .body(Body::wrap_stream(ReaderStream::new(file)))
        .send()
        .await
        .map_err(DriveError::from)
        .context("Failed to send update request")?;

    let updated = parse_file(response)
        .await
        .with_context(|| format!("Updating {file_id} failed"))?;
    debug!("Update completed: id={}, name={}", updated.id, updated.name);
    Ok(updated)
}

async fn open_source(source: &Path) -> Result<(File, u64)> {
    let file = File::open(source)
        .await
        .with_context(|| format!("Failed to open {}", source.display()))?;
    let size = file
        .metadata()
        .await
        .with_context(|| format!("Failed to stat {}", source.display()))?
        .len();
    Ok((file, size))
}

async fn parse_file(response: Response) -> Result<RemoteFile> {
    let file: DriveFile = check_status(response)
        .await?
        .json()
        .await
        .map_err(DriveError::from)
        .context("Failed to parse upload response")?;
    Ok(file.into_remote_file()?)
}

/// Opening and closing delimiters around the content of a
/// `multipart/related` body whose first part is `metadata`
fn multipart_frame(metadata: &serde_json::Value, boundary: &str) -> (String, String) {
    let head = format!(
        "--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{boundary}\r\n\
         Content-Type: {CONTENT_MIME_TYPE}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");
    (head, tail)
}

/// Opens a resumable session with `request` and sends `file` through it
///
/// `request` carries the method, path and metadata of the create or update;
/// the session parameters are added here.
async fn upload_resumable(
    client: &DriveClient,
    request: RequestBuilder,
    file: File,
    size: u64,
) -> Result<RemoteFile> {
    let response = request
        .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
        .header("X-Upload-Content-Type", CONTENT_MIME_TYPE)
        .header("X-Upload-Content-Length", size)
        .send()
        .await
        .map_err(DriveError::from)
        .context("Failed to start upload session")?;

    let response = check_status(response).await?;
    let session_uri = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DriveError::InvalidResponse("upload session has no Location".into()))?
        .to_string();

    send_chunks(client, &session_uri, file, size).await
}

/// Sends `file` to an open session, one chunk per request
///
/// Drive answers 308 until the last byte arrives; its `Range` header says
/// how much was persisted, and the next chunk starts right after that.
async fn send_chunks(
    client: &DriveClient,
    session_uri: &str,
    mut file: File,
    size: u64,
) -> Result<RemoteFile> {
    let chunk_size = client.chunk_size() as u64;
    let mut offset = 0u64;

    loop {
        if offset >= size {
            return Err(DriveError::InvalidResponse(format!(
                "upload session still open after all {size} bytes were accepted"
            ))
            .into());
        }

        let len = chunk_size.min(size - offset);
        let mut chunk = vec![0u8; len as usize];
        file.read_exact(&mut chunk)
            .await
            .context("Failed to read upload chunk")?;

        let last = offset + len - 1;
        let response = client
            .session_request(session_uri)
            .header(CONTENT_RANGE, format!("bytes {offset}-{last}/{size}"))
            .body(chunk)
            .send()
            .await
            .map_err(DriveError::from)
            .context("Failed to send upload chunk")?;

        if response.status() != StatusCode::PERMANENT_REDIRECT {
            let uploaded = parse_file(response).await?;
            debug!(id = %uploaded.id, size, "Resumable upload completed");
            return Ok(uploaded);
        }

        let persisted = persisted_len(response.headers())?;
        if persisted <= offset {
            return Err(DriveError::InvalidResponse(format!(
                "upload session made no progress at byte {offset}"
            ))
            .into());
        }
        if persisted != offset + len {
            file.seek(SeekFrom::Start(persisted))
                .await
                .context("Failed to rewind upload source")?;
        }
        debug!(persisted, size, "Upload chunk accepted");
        offset = persisted;
    }
}

/// Bytes the session has persisted, from a `Range: bytes=0-N` header
///
/// A 308 without `Range` means nothing was kept.
fn persisted_len(headers: &HeaderMap) -> Result<u64, DriveError> {
    let Some(value) = headers.get(RANGE) else {
        return Ok(0);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("bytes=0-"))
        .and_then(|end| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .ok_or_else(|| DriveError::InvalidResponse(format!("unexpected Range header {value:?}")))
}

//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts the endpoints a test needs on a wiremock server and
//! returns clients pointing at it.

use std::path::PathBuf;

use drivesync_core::domain::RemoteId;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivesync_drive::client::{Credential, DriveClient};

/// Folder every test syncs into
pub const FOLDER_ID: &str = "folder_abc123";

/// Starts a mock server and returns a bearer-authorized client for it
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url(
        Credential::Bearer("test-access-token".into()),
        server.uri(),
    );
    (server, client)
}

pub fn folder() -> RemoteId {
    RemoteId::new(FOLDER_ID.to_string()).unwrap()
}

/// Writes `content` to a file named `name` in `dir` and returns its path
pub fn source_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Builds a File resource the way Drive returns it
pub fn drive_file(id: &str, name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": size.to_string(),
        "modifiedTime": "2026-01-15T10:00:00.000Z"
    })
}

/// Mounts a single-page folder listing
pub async fn mount_list_single_page(server: &MockServer, files: Value) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            format!("'{FOLDER_ID}' in parents and trashed=false"),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": files })))
        .mount(server)
        .await;
}

/// Mounts a two-page folder listing
///
/// The first page carries `nextPageToken`; the second is only served to a
/// request echoing that token.
pub async fn mount_list_paginated(server: &MockServer, page1: Value, page2: Value) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page-2-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": page2 })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": page1,
            "nextPageToken": "page-2-token"
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// Mounts the multipart create endpoint
pub async fn mount_create(server: &MockServer, response_id: &str, response_name: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(drive_file(response_id, response_name, 5)),
        )
        .mount(server)
        .await;
}

/// Mounts the media update endpoint for `file_id`
pub async fn mount_update(server: &MockServer, file_id: &str, response_name: &str) {
    Mock::given(method("PATCH"))
        .and(path(format!("/upload/drive/v3/files/{file_id}")))
        .and(query_param("uploadType", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_file(file_id, response_name, 7)))
        .mount(server)
        .await;
}

/// Google error envelope
pub fn error_body(code: u16, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{ "message": message, "domain": "global", "reason": "test" }]
        }
    })
}

//! Integration tests for HTTP status mapping

use std::time::Duration;

use drivesync_core::domain::RemoteId;
use drivesync_drive::{upload, DriveError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn drive_error(err: &anyhow::Error) -> &DriveError {
    err.chain()
        .find_map(|e| e.downcast_ref::<DriveError>())
        .expect("error chain should contain a DriveError")
}

#[tokio::test]
async fn test_unauthorized_maps_message() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(common::error_body(401, "Invalid Credentials")),
        )
        .mount(&server)
        .await;

    let err = client.list_folder(&common::folder()).await.unwrap_err();
    match drive_error(&err) {
        DriveError::Unauthorized(msg) => assert_eq!(msg, "Invalid Credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_folder() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(common::error_body(404, "File not found: .")),
        )
        .mount(&server)
        .await;

    let err = client.list_folder(&common::folder()).await.unwrap_err();
    assert!(matches!(drive_error(&err), DriveError::NotFound(_)));
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(429)
                .append_header("Retry-After", "30")
                .set_body_json(common::error_body(429, "Rate Limit Exceeded")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "a.txt", b"a");
    let err = upload::create_file(&client, &common::folder(), "a.txt", &source)
        .await
        .unwrap_err();
    match drive_error(&err) {
        DriveError::TooManyRequests { retry_after } => {
            assert_eq!(*retry_after, Some(Duration::from_secs(30)))
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_without_envelope() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/f_500"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>unavailable</html>"))
        .mount(&server)
        .await;

    let id = RemoteId::new("f_500".to_string()).unwrap();
    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "x.bin", b"x");
    let err = upload::update_file(&client, &id, &source).await.unwrap_err();
    match drive_error(&err) {
        DriveError::ServerError(msg) => assert!(msg.contains("503")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_upload() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(common::error_body(403, "The user does not have sufficient permissions")),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "a.txt", b"a");
    let err = upload::create_file(&client, &common::folder(), "a.txt", &source)
        .await
        .unwrap_err();
    assert!(matches!(drive_error(&err), DriveError::Forbidden(_)));
}

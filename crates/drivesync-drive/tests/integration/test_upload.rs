//! Integration tests for create and update uploads

use drivesync_core::domain::RemoteId;
use drivesync_core::ports::IRemoteStore;
use drivesync_drive::client::UPLOAD_CHUNK_ALIGN;
use drivesync_drive::provider::DriveStore;
use drivesync_drive::upload;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path, query_param};
use tempfile::TempDir;
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_create_file_sends_multipart_metadata() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(header_regex("content-type", "^multipart/related; boundary=.+$"))
        .and(body_string_contains(r#""name":"report.txt""#))
        .and(body_string_contains(r#""parents":["folder_abc123"]"#))
        .and(body_string_contains("hello drive"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::drive_file("new_001", "report.txt", 11)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "report.txt", b"hello drive");
    let created = upload::create_file(&client, &common::folder(), "report.txt", &source)
        .await
        .expect("Create failed");

    assert_eq!(created.id.as_str(), "new_001");
    assert_eq!(created.name, "report.txt");
    assert_eq!(created.size, Some(11));
}

#[tokio::test]
async fn test_update_file_hits_media_endpoint() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/existing_42"))
        .and(query_param("uploadType", "media"))
        .and(header("content-type", "application/octet-stream"))
        .and(header("content-length", "11"))
        .and(body_string_contains("new content"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::drive_file("existing_42", "notes.md", 11)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = RemoteId::new("existing_42".to_string()).unwrap();
    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "notes.md", b"new content");
    let updated = upload::update_file(&client, &id, &source)
        .await
        .expect("Update failed");

    assert_eq!(updated.id, id);
    assert_eq!(updated.name, "notes.md");
}

#[tokio::test]
async fn test_update_empty_file() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_update(&server, "empty_1", "empty.txt").await;

    let id = RemoteId::new("empty_1".to_string()).unwrap();
    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "empty.txt", b"");
    let updated = upload::update_file(&client, &id, &source).await.unwrap();
    assert_eq!(updated.name, "empty.txt");
}

#[tokio::test]
async fn test_drive_store_delegates() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_single_page(&server, serde_json::json!([common::drive_file("f_1", "a.txt", 1)]))
        .await;
    common::mount_create(&server, "f_2", "b.txt").await;
    common::mount_update(&server, "f_1", "a.txt").await;

    let store = DriveStore::new(client);
    let folder = common::folder();

    let listed = store.list_folder(&folder).await.unwrap();
    assert_eq!(listed.len(), 1);

    let dir = TempDir::new().unwrap();
    let b = common::source_file(&dir, "b.txt", b"bbbbb");
    let a = common::source_file(&dir, "a.txt", b"aaaaaaa");

    let created = store.create_file(&folder, "b.txt", &b).await.unwrap();
    assert_eq!(created.id.as_str(), "f_2");

    let updated = store.update_file(&listed[0].id, &a).await.unwrap();
    assert_eq!(updated.id.as_str(), "f_1");
}

#[tokio::test]
async fn test_missing_source_fails_before_any_request() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_create(&server, "never", "gone.txt").await;

    let dir = TempDir::new().unwrap();
    let err = upload::create_file(&client, &common::folder(), "gone.txt", &dir.path().join("gone.txt"))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Failed to open"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Bodies of every chunk sent to the session, in order
async fn session_bodies(server: &wiremock::MockServer, session_path: &str) -> Vec<Vec<u8>> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT" && r.url.path() == session_path)
        .map(|r| r.body)
        .collect()
}

#[tokio::test]
async fn test_large_create_uses_resumable_session() {
    let (server, client) = common::setup_drive_mock().await;
    let client = client.with_upload_chunk_size(UPLOAD_CHUNK_ALIGN);
    let content = patterned(600_000);

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "resumable"))
        .and(header("x-upload-content-type", "application/octet-stream"))
        .and(header("x-upload-content-length", "600000"))
        .and(body_string_contains(r#""name":"big.bin""#))
        .and(body_string_contains(r#""parents":["folder_abc123"]"#))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", format!("{}/upload/session/create-1", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    for (range, persisted) in [
        ("bytes 0-262143/600000", "bytes=0-262143"),
        ("bytes 262144-524287/600000", "bytes=0-524287"),
    ] {
        Mock::given(method("PUT"))
            .and(path("/upload/session/create-1"))
            .and(header("content-range", range))
            .respond_with(ResponseTemplate::new(308).insert_header("Range", persisted))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("PUT"))
        .and(path("/upload/session/create-1"))
        .and(header("content-range", "bytes 524288-599999/600000"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::drive_file("big_1", "big.bin", 600_000)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "big.bin", &content);
    let created = upload::create_file(&client, &common::folder(), "big.bin", &source)
        .await
        .expect("Resumable create failed");

    assert_eq!(created.id.as_str(), "big_1");
    assert_eq!(created.size, Some(600_000));
    assert_eq!(session_bodies(&server, "/upload/session/create-1").await.concat(), content);
}

#[tokio::test]
async fn test_resumable_update_resends_unpersisted_bytes() {
    let (server, client) = common::setup_drive_mock().await;
    let client = client.with_upload_chunk_size(UPLOAD_CHUNK_ALIGN);
    let content = patterned(300_000);

    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/big_2"))
        .and(query_param("uploadType", "resumable"))
        .and(header("x-upload-content-length", "300000"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", format!("{}/upload/session/update-2", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Drive kept only the first 100000 bytes of the first chunk.
    Mock::given(method("PUT"))
        .and(path("/upload/session/update-2"))
        .and(header("content-range", "bytes 0-262143/300000"))
        .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-99999"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session/update-2"))
        .and(header("content-range", "bytes 100000-299999/300000"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::drive_file("big_2", "big.bin", 300_000)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "big.bin", &content);
    let id = RemoteId::new("big_2".to_string()).unwrap();
    let updated = upload::update_file(&client, &id, &source).await.unwrap();

    assert_eq!(updated.id, id);
    let bodies = session_bodies(&server, "/upload/session/update-2").await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1], content[100_000..]);
}

#[tokio::test]
async fn test_file_of_exactly_one_chunk_is_single_request() {
    let (server, client) = common::setup_drive_mock().await;
    let client = client.with_upload_chunk_size(UPLOAD_CHUNK_ALIGN);
    common::mount_update(&server, "edge_1", "edge.bin").await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "edge.bin", &patterned(UPLOAD_CHUNK_ALIGN));
    let id = RemoteId::new("edge_1".to_string()).unwrap();
    upload::update_file(&client, &id, &source).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body.len(), UPLOAD_CHUNK_ALIGN);
}

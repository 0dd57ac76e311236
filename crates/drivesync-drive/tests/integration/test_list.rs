//! Integration tests for folder listing

use drivesync_drive::client::{Credential, DriveClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_list_single_page() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_single_page(
        &server,
        json!([
            common::drive_file("id_a", "a.txt", 10),
            common::drive_file("id_b", "b.txt", 20),
        ]),
    )
    .await;

    let files = client.list_folder(&common::folder()).await.expect("List failed");

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].id.as_str(), "id_a");
    assert_eq!(files[0].name, "a.txt");
    assert_eq!(files[0].size, Some(10));
    assert_eq!(files[1].name, "b.txt");
}

#[tokio::test]
async fn test_list_sends_fields_and_page_size() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("fields", "nextPageToken, files(id, name, size, modifiedTime)"))
        .and(query_param("pageSize", "1000"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let files = client.list_folder(&common::folder()).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_list_follows_pagination() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_paginated(
        &server,
        json!([common::drive_file("id_1", "one.txt", 1)]),
        json!([
            common::drive_file("id_2", "two.txt", 2),
            common::drive_file("id_3", "three.txt", 3),
        ]),
    )
    .await;

    let files = client.list_folder(&common::folder()).await.unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();

    assert_eq!(names, ["one.txt", "two.txt", "three.txt"]);
}

#[tokio::test]
async fn test_list_with_api_key() {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url(Credential::ApiKey("AIzaTestKey".into()), server.uri());

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("key", "AIzaTestKey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [common::drive_file("id_k", "k.txt", 4)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = client.list_folder(&common::folder()).await.unwrap();
    assert_eq!(files[0].id.as_str(), "id_k");
}

#[tokio::test]
async fn test_list_rejects_malformed_id() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_single_page(&server, json!([{ "id": "bad id/", "name": "x" }])).await;

    let err = client.list_folder(&common::folder()).await.unwrap_err();
    assert!(format!("{err:#}").contains("bad file id"));
}

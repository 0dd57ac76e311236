//! Integration tests for keeping the OAuth token valid during a run

use std::sync::Arc;

use chrono::{Duration, Utc};
use drivesync_core::ports::{IRemoteStore, ITokenStore, Tokens};
use drivesync_core::usecases::AuthenticateUseCase;
use drivesync_drive::auth::{DriveAuthAdapter, OAuth2Config};
use drivesync_drive::client::{Credential, DriveClient};
use drivesync_drive::provider::DriveStore;
use drivesync_drive::token_store::FileTokenStorage;
use drivesync_drive::DriveError;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

struct Fixture {
    server: MockServer,
    storage: FileTokenStorage,
    store: DriveStore,
    _dir: TempDir,
}

/// A store whose token endpoint and Drive API both live on one mock server
async fn fixture(access_token: &str, refresh_token: Option<&str>, valid_for: Duration) -> Fixture {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let storage = FileTokenStorage::new(dir.path().join("token.json"));

    let config = OAuth2Config::new("client-123", "secret-456").with_endpoints(
        format!("{}/auth", server.uri()),
        format!("{}/token", server.uri()),
    );
    let auth = AuthenticateUseCase::new(
        Arc::new(DriveAuthAdapter::new(config).without_browser()),
        Arc::new(storage.clone()),
    );
    let tokens = Tokens {
        access_token: access_token.to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expiry: Some(Utc::now() + valid_for),
    };
    let client = DriveClient::with_base_url(Credential::Bearer(String::new()), server.uri());
    let store = DriveStore::with_oauth(client, tokens, Arc::new(auth));

    Fixture {
        server,
        storage,
        store,
        _dir: dir,
    }
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_listing_for(server: &MockServer, token: &str, status: u16, expected_calls: u64) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "files": [common::drive_file("f_1", "a.txt", 1)]
        }))
    } else {
        ResponseTemplate::new(status).set_body_json(common::error_body(status, "Invalid Credentials"))
    };
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", format!("Bearer {token}")))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_request_retried() {
    let f = fixture("stale-token", Some("1//refresh"), Duration::hours(1)).await;
    mount_token_endpoint(&f.server, 1).await;
    mount_listing_for(&f.server, "stale-token", 401, 1).await;
    mount_listing_for(&f.server, "fresh-token", 200, 1).await;

    let files = f.store.list_folder(&common::folder()).await.unwrap();

    assert_eq!(files.len(), 1);
    let saved = f.storage.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh-token");
    assert_eq!(saved.refresh_token.as_deref(), Some("1//refresh"));
}

#[tokio::test]
async fn test_token_near_expiry_is_refreshed_before_request() {
    let f = fixture("expiring-token", Some("1//refresh"), Duration::seconds(20)).await;
    mount_token_endpoint(&f.server, 1).await;
    mount_listing_for(&f.server, "expiring-token", 200, 0).await;
    mount_listing_for(&f.server, "fresh-token", 200, 2).await;

    let folder = common::folder();
    f.store.list_folder(&folder).await.unwrap();
    // The renewed token is good for an hour; no second refresh.
    f.store.list_folder(&folder).await.unwrap();
}

#[tokio::test]
async fn test_rejection_without_refresh_token_is_reported() {
    let f = fixture("stale-token", None, Duration::hours(1)).await;
    mount_token_endpoint(&f.server, 0).await;
    mount_listing_for(&f.server, "stale-token", 401, 1).await;

    let err = f.store.list_folder(&common::folder()).await.unwrap_err();

    assert!(err
        .chain()
        .any(|e| matches!(e.downcast_ref::<DriveError>(), Some(DriveError::Unauthorized(_)))));
}

#[tokio::test]
async fn test_upload_retry_resends_whole_file() {
    let f = fixture("stale-token", Some("1//refresh"), Duration::hours(1)).await;
    mount_token_endpoint(&f.server, 1).await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(common::error_body(401, "Invalid Credentials")),
        )
        .expect(1)
        .mount(&f.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(header("authorization", "Bearer fresh-token"))
        .and(body_string_contains("retry me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::drive_file("new_9", "r.txt", 8)),
        )
        .expect(1)
        .mount(&f.server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = common::source_file(&dir, "r.txt", b"retry me");
    let created = f
        .store
        .create_file(&common::folder(), "r.txt", &source)
        .await
        .unwrap();

    assert_eq!(created.id.as_str(), "new_9");
}

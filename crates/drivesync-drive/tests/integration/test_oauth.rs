//! Integration tests for the OAuth token endpoint exchange

use drivesync_drive::auth::{AuthCodeFlow, OAuth2Config};
use oauth2::PkceCodeVerifier;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OAuth2Config {
    OAuth2Config::new("client-123", "secret-456").with_endpoints(
        format!("{}/auth", server.uri()),
        format!("{}/token", server.uri()),
    )
}

#[tokio::test]
async fn test_exchange_code_posts_code_and_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2F0Acode"))
        .and(body_string_contains("code_verifier=test-verifier"))
        .and(body_string_contains("client_secret=secret-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "token_type": "Bearer",
            "expires_in": 3599,
            "refresh_token": "1//refresh",
            "scope": "https://www.googleapis.com/auth/drive.file"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = AuthCodeFlow::new(&config_for(&server)).unwrap();
    let tokens = flow
        .exchange_code(
            "4/0Acode".to_string(),
            PkceCodeVerifier::new("test-verifier".to_string()),
        )
        .await
        .expect("Exchange failed");

    assert_eq!(tokens.access_token, "ya29.fresh");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
    assert!(tokens.expiry.is_some());
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.refreshed",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = AuthCodeFlow::new(&config_for(&server)).unwrap();
    let tokens = flow.refresh_token("1//keep-me").await.unwrap();

    assert_eq!(tokens.access_token, "ya29.refreshed");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//keep-me"));
}

#[tokio::test]
async fn test_refresh_rejected_by_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let flow = AuthCodeFlow::new(&config_for(&server)).unwrap();
    assert!(flow.refresh_token("1//revoked").await.is_err());
}

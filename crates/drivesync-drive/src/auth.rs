//! OAuth2 authorization-code flow for Google APIs
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) and a
//! loopback redirect for authenticating installed applications with Google.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Configuration for the OAuth2 flow
//! - [`AuthCodeFlow`] - Authorization URL, code exchange and refresh
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`DriveAuthAdapter`] - Orchestrates the full authentication flow

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use drivesync_core::config::{DEFAULT_REDIRECT_PORT, DEFAULT_SCOPE};
use drivesync_core::ports::{IAuthProvider, Tokens};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    TokenResponse, TokenUrl,
};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Message shown in the browser once the code has been received
const SUCCESS_MESSAGE: &str = "Authorization code received. You can now close this window.";

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 authorization-code flow
#[derive(Clone)]
pub struct OAuth2Config {
    /// OAuth client ID from the Google Cloud console
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// Loopback port the callback server listens on
    pub redirect_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a new OAuth2Config with Google endpoints and default settings
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri_for(DEFAULT_REDIRECT_PORT),
            redirect_port: DEFAULT_REDIRECT_PORT,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Sets custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the loopback port; the redirect URI follows it
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self.redirect_uri = redirect_uri_for(port);
        self
    }

    /// Overrides the authorization and token endpoints
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }
}

impl std::fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

fn redirect_uri_for(port: u16) -> String {
    format!("http://localhost:{port}")
}

// ============================================================================
// AuthCodeFlow
// ============================================================================

/// OAuth2 authorization-code flow using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct AuthCodeFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http_client: reqwest::Client,
    scopes: Vec<String>,
}

impl AuthCodeFlow {
    /// Creates a new AuthCodeFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        // Token requests must not follow redirects (SSRF guard in oauth2 5)
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client,
            http_client,
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access and forces the consent screen so Google
    /// issues a refresh token on every login.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    ///
    /// # Arguments
    /// * `code` - The authorization code received from the callback
    /// * `pkce_verifier` - The PKCE verifier generated alongside the auth URL
    pub async fn exchange_code(&self, code: String, pkce_verifier: PkceCodeVerifier) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .context("Failed to exchange authorization code")?;

        info!("Successfully obtained OAuth tokens");
        Ok(tokens_from_response(&token_result, None))
    }

    /// Refreshes an expired access token using a refresh token
    ///
    /// Google usually omits the refresh token from refresh responses; the
    /// one passed in is kept in that case.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .context("Failed to refresh token")?;

        info!("Successfully refreshed access token");
        Ok(tokens_from_response(&token_result, Some(refresh_token)))
    }
}

fn tokens_from_response(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> Tokens {
    let expiry = response
        .expires_in()
        .and_then(|d| Duration::from_std(d).ok())
        .map(|d| Utc::now() + d);

    Tokens {
        access_token: response.access_token().secret().to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or_else(|| previous_refresh.map(str::to_string)),
        expiry,
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

/// What a callback request carried
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackOutcome {
    Code(CallbackParams),
    Denied(String),
}

/// Minimal HTTP server that listens on the loopback interface for the
/// OAuth2 redirect callback.
///
/// The listener is bound by [`LocalCallbackServer::bind`], before the
/// browser is sent to the authorization page, so a fast redirect cannot
/// arrive at a closed port. Requests without `code` or `error` (for example
/// favicon fetches, stray reloads) get an error page and the server keeps waiting.
pub struct LocalCallbackServer {
    listener: TcpListener,
}

impl LocalCallbackServer {
    /// Binds the callback listener on `127.0.0.1:<port>`
    ///
    /// Port 0 picks a free port; see [`local_addr`](Self::local_addr).
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind callback server to 127.0.0.1:{port}"))?;

        info!("Local OAuth callback server listening on 127.0.0.1:{port}");
        Ok(Self { listener })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read callback server address")
    }

    /// Serves connections until one carries the authorization result
    ///
    /// # Returns
    /// The callback parameters (code and state) extracted from the redirect URL
    ///
    /// # Errors
    /// Returns an error if the provider redirected with `error=...` or the
    /// listener fails.
    pub async fn wait_for_callback(self) -> Result<CallbackParams> {
        let (tx, mut rx) = oneshot::channel::<CallbackOutcome>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let outcome = loop {
            tokio::select! {
                outcome = &mut rx => {
                    break outcome.context("Callback server channel closed without receiving parameters")?;
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted.context("Failed to accept connection on callback server")?;
                    debug!(%addr, "Callback server accepted connection");

                    let tx = tx.clone();
                    let service = service_fn(move |req: Request<Incoming>| {
                        let tx = tx.clone();
                        let uri = req.uri().to_string();
                        async move { Ok::<_, Infallible>(handle_callback(&uri, &tx).await) }
                    });

                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            warn!("Callback server connection error: {}", e);
                        }
                    });
                }
            }
        };

        match outcome {
            CallbackOutcome::Code(params) => {
                info!("Received OAuth callback with authorization code");
                Ok(params)
            }
            CallbackOutcome::Denied(error) => {
                anyhow::bail!("Authorization was denied: {error}")
            }
        }
    }
}

async fn handle_callback(
    uri: &str,
    tx: &Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
) -> Response<Full<Bytes>> {
    debug!("Callback server received request: {}", uri);

    match parse_callback_params(uri) {
        Some(outcome) => {
            let response = match &outcome {
                CallbackOutcome::Code(_) => html_response(StatusCode::OK, success_html()),
                CallbackOutcome::Denied(error) => html_response(
                    StatusCode::BAD_REQUEST,
                    error_html(&format!("Authorization failed: {error}")),
                ),
            };
            if let Some(sender) = tx.lock().await.take() {
                let _ = sender.send(outcome);
            }
            response
        }
        None => html_response(
            StatusCode::NOT_FOUND,
            error_html("Missing authorization code in callback"),
        ),
    }
}

fn html_response(status: StatusCode, html: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(html)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Parses the authorization result from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackOutcome> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(CallbackOutcome::Denied(error));
    }

    Some(CallbackOutcome::Code(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    }))
}

/// Returns the HTML for a successful authorization page
fn success_html() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>drivesync - Authorization</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>drivesync</h1>
    <p>{}</p>
</body>
</html>"#,
        SUCCESS_MESSAGE
    )
}

/// Returns the HTML for an authorization error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>drivesync - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// DriveAuthAdapter
// ============================================================================

/// Callback receiving the authorization URL before the browser is opened
pub type UrlPrompt = Arc<dyn Fn(&str) + Send + Sync>;

/// High-level authentication adapter that orchestrates the interactive flow.
///
/// Combines [`AuthCodeFlow`], [`LocalCallbackServer`], and browser launching:
///
/// 1. Binds the loopback callback server
/// 2. Generates the PKCE authorization URL and shows it
/// 3. Opens the user's browser to the Google consent page
/// 4. Waits for the redirect and checks the CSRF state
/// 5. Exchanges the authorization code for tokens
pub struct DriveAuthAdapter {
    config: OAuth2Config,
    prompt: Option<UrlPrompt>,
    open_browser: bool,
}

impl DriveAuthAdapter {
    /// Creates a new DriveAuthAdapter with the given configuration
    pub fn new(config: OAuth2Config) -> Self {
        Self {
            config,
            prompt: None,
            open_browser: true,
        }
    }

    /// Sets a callback that displays the authorization URL to the user
    pub fn with_prompt(mut self, prompt: UrlPrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Disables launching the browser; the URL is still shown
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// Runs the interactive flow against an already bound callback server
    async fn login_with(&self, server: LocalCallbackServer) -> Result<Tokens> {
        let flow = AuthCodeFlow::new(&self.config)?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Authorization URL: {}", auth_url);
        if let Some(prompt) = &self.prompt {
            prompt(&auth_url);
        }

        if self.open_browser {
            info!("Opening browser for authorization");
            if let Err(e) = webbrowser::open(&auth_url) {
                warn!("Failed to open browser, open the URL manually: {}", e);
            }
        }

        let callback = server.wait_for_callback().await?;
        if callback.state != *csrf_token.secret() {
            anyhow::bail!("OAuth state mismatch in callback; possible CSRF, aborting");
        }

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;
        info!("OAuth2 login completed successfully");
        Ok(tokens)
    }
}

#[async_trait::async_trait]
impl IAuthProvider for DriveAuthAdapter {
    /// Performs the full interactive login flow
    async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 login flow");
        let server = LocalCallbackServer::bind(self.config.redirect_port).await?;
        self.login_with(server).await
    }

    /// Refreshes an expired access token
    async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let flow = AuthCodeFlow::new(&self.config)?;
        flow.refresh_token(refresh_token).await
    }
}

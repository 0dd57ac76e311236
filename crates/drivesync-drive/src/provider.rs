//! DriveStore - IRemoteStore implementation for the Google Drive v3 API
//!
//! Wraps the [`DriveClient`] and delegates to the client and upload modules
//! to fulfil the [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - Uses `tokio::sync::RwLock` so concurrent uploads take a snapshot of the
//!   client under a read lock; only a token refresh takes the write lock.
//! - A store built with [`DriveStore::with_oauth`] keeps its access token
//!   valid for the whole run: it refreshes ahead of expiry, and a request
//!   rejected with 401 is retried once with a refreshed token.
//! - The interactive flow lives in [`DriveAuthAdapter`](crate::auth::DriveAuthAdapter);
//!   this store never opens a browser.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use drivesync_core::domain::RemoteId;
use drivesync_core::ports::{IRemoteStore, RemoteFile, Tokens};
use drivesync_core::usecases::AuthenticateUseCase;

use crate::client::{Credential, DriveClient};
use crate::{upload, DriveError};

/// OAuth token shared by every request of one store
struct TokenSession {
    auth: Arc<AuthenticateUseCase>,
    /// Serializes refreshes so concurrent uploads renew the token once
    tokens: Mutex<Tokens>,
}

/// Google Drive implementation of [`IRemoteStore`]
pub struct DriveStore {
    /// The underlying Drive API client
    client: RwLock<DriveClient>,
    /// Present when the client is authorized with an OAuth access token
    session: Option<TokenSession>,
}

impl DriveStore {
    /// Creates a new `DriveStore` wrapping the given [`DriveClient`]
    ///
    /// The client's credential is used as-is for every request.
    pub fn new(client: DriveClient) -> Self {
        Self {
            client: RwLock::new(client),
            session: None,
        }
    }

    /// Creates a store authorized with `tokens` that refreshes them through
    /// `auth` when they expire or are rejected
    pub fn with_oauth(
        mut client: DriveClient,
        tokens: Tokens,
        auth: Arc<AuthenticateUseCase>,
    ) -> Self {
        client.set_credential(Credential::Bearer(tokens.access_token.clone()));
        Self {
            client: RwLock::new(client),
            session: Some(TokenSession {
                auth,
                tokens: Mutex::new(tokens),
            }),
        }
    }

    async fn install_token(&self, access_token: String) {
        self.client
            .write()
            .await
            .set_credential(Credential::Bearer(access_token));
    }

    /// Refreshes ahead of expiry, then runs `op` against a snapshot of the
    /// client, retrying once after a 401
    async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(DriveClient) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        if let Some(session) = &self.session {
            let mut tokens = session.tokens.lock().await;
            if let Some(renewed) = session.auth.refresh_if_needed(&tokens).await? {
                debug!("Access token near expiry, refreshed");
                *tokens = renewed;
                self.install_token(tokens.access_token.clone()).await;
            }
        }

        let client = self.client.read().await.clone();
        let rejected = match client.credential() {
            Credential::Bearer(token) => token.clone(),
            Credential::ApiKey(_) => String::new(),
        };

        let err = match op(client).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let Some(session) = &self.session else {
            return Err(err);
        };
        if !is_unauthorized(&err) {
            return Err(err);
        }

        {
            let mut tokens = session.tokens.lock().await;
            // Another task may have refreshed while this request was in flight.
            if tokens.access_token == rejected {
                if !tokens.can_refresh() {
                    return Err(err);
                }
                *tokens = session.auth.refresh(&tokens).await?;
                info!("Access token was rejected, refreshed it");
            }
            self.install_token(tokens.access_token.clone()).await;
        }

        let client = self.client.read().await.clone();
        op(client).await
    }
}

/// True when `err` was caused by an HTTP 401
fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<DriveError>(),
            Some(DriveError::Unauthorized(_))
        )
    })
}

#[async_trait::async_trait]
impl IRemoteStore for DriveStore {
    /// Lists the folder, following pagination
    ///
    /// Delegates to [`DriveClient::list_folder`].
    async fn list_folder(&self, folder: &RemoteId) -> Result<Vec<RemoteFile>> {
        debug!(folder = %folder, "DriveStore::list_folder");
        self.call(|client| async move { client.list_folder(folder).await })
            .await
    }

    /// Delegates to [`upload::create_file`].
    async fn create_file(
        &self,
        folder: &RemoteId,
        name: &str,
        source: &Path,
    ) -> Result<RemoteFile> {
        debug!(folder = %folder, name, "DriveStore::create_file");
        self.call(|client| async move { upload::create_file(&client, folder, name, source).await })
            .await
    }

    /// Delegates to [`upload::update_file`].
    async fn update_file(&self, id: &RemoteId, source: &Path) -> Result<RemoteFile> {
        debug!(id = %id, "DriveStore::update_file");
        self.call(|client| async move { upload::update_file(&client, id, source).await })
            .await
    }
}

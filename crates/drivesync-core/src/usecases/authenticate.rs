//! Authentication use case
//!
//! Decides where the OAuth token for a run comes from: the token store, a
//! refresh against the authorization server, or the interactive browser
//! flow. Any newly obtained token is written back to the store so the next
//! run can skip the browser.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::ports::{IAuthProvider, ITokenStore, Tokens};

/// Tokens expiring within this window are refreshed up front
const REFRESH_MARGIN_SECS: i64 = 60;

/// Where the tokens returned by [`AuthenticateUseCase::obtain_tokens`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Loaded from the token store, still valid
    Stored,
    /// Stored token was expired and has been refreshed
    Refreshed,
    /// Obtained through the interactive authorization flow
    Interactive,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenSource::Stored => "stored",
            TokenSource::Refreshed => "refreshed",
            TokenSource::Interactive => "interactive",
        };
        f.write_str(s)
    }
}

/// Result of [`AuthenticateUseCase::obtain_tokens`]
#[derive(Debug, Clone)]
pub struct ObtainedTokens {
    /// Tokens to authorize API requests with
    pub tokens: Tokens,
    /// How they were obtained
    pub source: TokenSource,
    /// Recoverable failures on the way (unreadable token file, failed refresh)
    pub notes: Vec<String>,
}

/// Use case for authentication operations
pub struct AuthenticateUseCase {
    auth_provider: Arc<dyn IAuthProvider>,
    token_store: Arc<dyn ITokenStore>,
}

impl AuthenticateUseCase {
    /// Creates a new AuthenticateUseCase
    ///
    /// # Arguments
    ///
    /// * `auth_provider` - Interactive login and refresh
    /// * `token_store` - Persistence for the token record
    pub fn new(auth_provider: Arc<dyn IAuthProvider>, token_store: Arc<dyn ITokenStore>) -> Self {
        Self {
            auth_provider,
            token_store,
        }
    }

    /// Returns usable tokens, prompting the user only when necessary
    ///
    /// 1. A valid stored token is returned as-is (the store is not rewritten).
    /// 2. An expired stored token with a refresh token is refreshed and saved.
    /// 3. Otherwise the interactive flow runs and its tokens are saved.
    ///
    /// An unreadable store and a failed refresh are recorded in
    /// [`ObtainedTokens::notes`] and fall through to the next step.
    ///
    /// # Errors
    ///
    /// Returns an error if the interactive flow fails or the new token
    /// cannot be saved.
    pub async fn obtain_tokens(&self) -> Result<ObtainedTokens> {
        let mut notes = Vec::new();

        let stored = match self.token_store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                notes.push(format!("Ignoring unreadable token file: {e:#}"));
                None
            }
        };

        if let Some(tokens) = stored {
            if !tokens.expires_within(Duration::seconds(REFRESH_MARGIN_SECS)) {
                return Ok(ObtainedTokens {
                    tokens,
                    source: TokenSource::Stored,
                    notes,
                });
            }

            if tokens.can_refresh() {
                match self.refresh(&tokens).await {
                    Ok(refreshed) => {
                        return Ok(ObtainedTokens {
                            tokens: refreshed,
                            source: TokenSource::Refreshed,
                            notes,
                        });
                    }
                    Err(e) => notes.push(format!("{e:#}")),
                }
            }
        }

        let tokens = self.login().await?;
        Ok(ObtainedTokens {
            tokens,
            source: TokenSource::Interactive,
            notes,
        })
    }

    /// Exchanges the refresh token in `tokens` for a new access token
    ///
    /// The new record is saved before it is returned, so a token refreshed
    /// in the middle of a run is also picked up by the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if `tokens` carries no refresh token, the
    /// authorization server rejects it, or the result cannot be saved.
    pub async fn refresh(&self, tokens: &Tokens) -> Result<Tokens> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("Token has no refresh token; run `drivesync auth login`")?;

        let refreshed = self
            .auth_provider
            .refresh(refresh_token)
            .await
            .context("Token refresh failed")?;

        self.token_store
            .save(&refreshed)
            .await
            .context("Failed to save refreshed token")?;

        Ok(refreshed)
    }

    /// Refreshes `tokens` when they expire within the refresh margin
    ///
    /// Returns `None` when the access token is still good, or when it has
    /// no refresh token to renew it with.
    ///
    /// # Errors
    ///
    /// Same as [`AuthenticateUseCase::refresh`].
    pub async fn refresh_if_needed(&self, tokens: &Tokens) -> Result<Option<Tokens>> {
        if !tokens.expires_within(Duration::seconds(REFRESH_MARGIN_SECS)) || !tokens.can_refresh() {
            return Ok(None);
        }
        self.refresh(tokens).await.map(Some)
    }

    /// Runs the interactive flow unconditionally and saves the result
    ///
    /// # Errors
    ///
    /// Returns an error if the flow fails or the token cannot be saved.
    pub async fn login(&self) -> Result<Tokens> {
        let tokens = self
            .auth_provider
            .login()
            .await
            .context("Interactive authorization failed")?;

        self.token_store
            .save(&tokens)
            .await
            .context("Failed to save token")?;

        Ok(tokens)
    }

    /// Removes the stored token
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub async fn logout(&self) -> Result<()> {
        self.token_store
            .clear()
            .await
            .context("Failed to clear stored token")
    }
}

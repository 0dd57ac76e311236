//! Authentication ports (driven/secondary ports)
//!
//! Defines the OAuth token record and the two seams the
//! [`AuthenticateUseCase`](crate::usecases::AuthenticateUseCase) drives:
//! an interactive provider and a token store.
//!
//! ## Token file layout
//!
//! [`Tokens`] serializes to the same JSON keys as the golang `oauth2.Token`
//! (`access_token`, `token_type`, `refresh_token`, `expiry`), so a token
//! file written by another OAuth client for the same app loads unchanged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth tokens received from the authorization server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token type, always "Bearer" for Google
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Token for refreshing the access token without user interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Tokens {
    /// Expiry, ignoring unset and zero-time values
    fn effective_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|e| e.timestamp() > 0)
    }

    /// Returns true if the access token has expired
    ///
    /// A token without an expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.effective_expiry()
            .map(|expiry| Utc::now() >= expiry)
            .unwrap_or(false)
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: Duration) -> bool {
        self.effective_expiry()
            .map(|expiry| Utc::now() + duration >= expiry)
            .unwrap_or(false)
    }

    /// Returns true if a refresh token is available
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}

/// Port trait for obtaining tokens from the authorization server
#[async_trait::async_trait]
pub trait IAuthProvider: Send + Sync {
    /// Runs the interactive authorization flow
    async fn login(&self) -> anyhow::Result<Tokens>;

    /// Exchanges a refresh token for a fresh access token
    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<Tokens>;
}

/// Port trait for persisting the token record
#[async_trait::async_trait]
pub trait ITokenStore: Send + Sync {
    /// Loads the stored token, `None` when nothing has been stored
    async fn load(&self) -> anyhow::Result<Option<Tokens>>;

    /// Persists `tokens`, replacing any previous record
    async fn save(&self, tokens: &Tokens) -> anyhow::Result<()>;

    /// Removes the stored record; succeeds when nothing is stored
    async fn clear(&self) -> anyhow::Result<()>;
}

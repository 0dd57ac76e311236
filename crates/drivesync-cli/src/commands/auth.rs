//! Auth commands - Login, Logout, and Status for Google Drive authorization
//!
//! Provides the `drivesync auth` CLI subcommands which:
//! 1. `login`  - Runs the OAuth2 loopback flow and writes the token file.
//! 2. `logout` - Deletes the token file.
//! 3. `status` - Shows which credential is configured and whether the
//!    stored token is still valid.

use anyhow::{Context, Result};
use clap::Subcommand;
use drivesync_core::config::{Config, Credentials};
use drivesync_core::ports::ITokenStore;
use drivesync_drive::token_store::FileTokenStorage;
use tracing::info;

use super::authenticate_usecase;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize drivesync with Google Drive via OAuth2
    Login,
    /// Remove the stored token
    Logout,
    /// Check authorization status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        match self {
            AuthCommand::Login => self.execute_login(&config, &*fmt).await,
            AuthCommand::Logout => self.execute_logout(&config, &*fmt).await,
            AuthCommand::Status => self.execute_status(&config, &*fmt, format).await,
        }
    }

    /// Runs the interactive flow unconditionally and saves the token
    async fn execute_login(&self, config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
        let (client_id, client_secret) = match config.credentials()? {
            Credentials::OAuth {
                client_id,
                client_secret,
            } => (client_id, client_secret),
            Credentials::ApiKey(_) => anyhow::bail!(
                "An API key needs no login; set DRIVESYNC_CLIENT_ID and DRIVESYNC_CLIENT_SECRET to use OAuth"
            ),
        };

        info!(token_file = %config.auth.token_file.display(), "Starting OAuth2 login");
        fmt.info("Opening browser for Google authorization...");

        let usecase = authenticate_usecase(config, &client_id, &client_secret);
        usecase.login().await?;

        fmt.success("Authorization complete");
        fmt.info(&format!(
            "Token saved to {}",
            config.auth.token_file.display()
        ));
        Ok(())
    }

    async fn execute_logout(&self, config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
        let storage = FileTokenStorage::new(config.auth.token_file.clone());
        let existed = storage.path().exists();

        storage
            .clear()
            .await
            .context("Failed to remove stored token")?;

        if existed {
            fmt.success("Logged out successfully");
            fmt.info(&format!("Removed {}", storage.path().display()));
        } else {
            fmt.info("No stored token. Nothing to log out.");
        }
        Ok(())
    }

    async fn execute_status(
        &self,
        config: &Config,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let method = match config.credentials() {
            Ok(Credentials::OAuth { .. }) => "oauth",
            Ok(Credentials::ApiKey(_)) => "api_key",
            Err(_) => "none",
        };

        let storage = FileTokenStorage::new(config.auth.token_file.clone());
        let (token_status, expiry) = match storage.load().await {
            Ok(Some(tokens)) => {
                let status = if !tokens.is_expired() {
                    "Valid"
                } else if tokens.can_refresh() {
                    "Expired (refreshable)"
                } else {
                    "Expired"
                };
                (status, tokens.expiry)
            }
            Ok(None) => ("Not found", None),
            Err(_) => ("Unreadable", None),
        };

        if format.is_json() {
            let json = serde_json::json!({
                "credentials": method,
                "token_file": config.auth.token_file.display().to_string(),
                "token_status": token_status,
                "expiry": expiry.map(|t| t.to_rfc3339()),
            });
            fmt.print_json(&json);
            return Ok(());
        }

        match method {
            "oauth" => fmt.success("OAuth client configured"),
            "api_key" => fmt.success("API key configured"),
            _ => fmt.warn("No credentials configured"),
        }
        fmt.info(&format!("Token file:    {}", config.auth.token_file.display()));
        fmt.info(&format!("Token status:  {}", token_status));
        if let Some(expiry) = expiry.filter(|e| e.timestamp() > 0) {
            fmt.info(&format!(
                "Expires:       {}",
                expiry.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        if method == "oauth" && token_status == "Not found" {
            fmt.info("Run 'drivesync auth login' to authorize");
        }

        Ok(())
    }
}

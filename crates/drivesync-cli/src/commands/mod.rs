//! Subcommands of the `drivesync` binary

pub mod auth;
pub mod config;
pub mod sync;

use std::sync::Arc;

use drivesync_core::config::Config;
use drivesync_core::usecases::AuthenticateUseCase;
use drivesync_drive::auth::{DriveAuthAdapter, OAuth2Config};
use drivesync_drive::token_store::FileTokenStorage;

/// Builds the OAuth flow settings from the `auth` section
pub(crate) fn oauth_config(config: &Config, client_id: &str, client_secret: &str) -> OAuth2Config {
    OAuth2Config::new(client_id, client_secret)
        .with_redirect_port(config.auth.redirect_port)
        .with_scopes(config.auth.scopes.clone())
}

/// Wires the Drive OAuth adapter and the token file into the use case
pub(crate) fn authenticate_usecase(
    config: &Config,
    client_id: &str,
    client_secret: &str,
) -> AuthenticateUseCase {
    let adapter = DriveAuthAdapter::new(oauth_config(config, client_id, client_secret)).with_prompt(
        Arc::new(|url: &str| {
            eprintln!("Go to the following link in your browser to authorize drivesync:\n\n{url}\n");
        }),
    );
    let store = FileTokenStorage::new(config.auth.token_file.clone());
    AuthenticateUseCase::new(Arc::new(adapter), Arc::new(store))
}

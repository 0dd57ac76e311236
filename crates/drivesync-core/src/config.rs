//! Configuration module for drivesync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RemoteId;

/// Google Drive scope limited to files created or opened by this app.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Port of the loopback listener that receives the OAuth redirect.
pub const DEFAULT_REDIRECT_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivesync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory whose files are pushed to the remote folder.
    pub source: PathBuf,
    /// Identifier of the destination folder in Google Drive.
    pub folder_id: Option<String>,
    /// Upper bound on concurrent uploads; `0` starts one task per file at once.
    pub max_concurrent: usize,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID from the Google Cloud console.
    pub client_id: Option<String>,
    /// OAuth client secret paired with `client_id`.
    pub client_secret: Option<String>,
    /// API key, used only when no OAuth client is configured.
    pub api_key: Option<String>,
    /// File holding the OAuth token between runs.
    pub token_file: PathBuf,
    /// Port for the local redirect listener.
    pub redirect_port: u16,
    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("drivesync")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_key: None,
            token_file: config_dir().join("token.json"),
            redirect_port: DEFAULT_REDIRECT_PORT,
            scopes: vec![DEFAULT_SCOPE.to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

/// OAuth client ID.
pub const ENV_CLIENT_ID: &str = "DRIVESYNC_CLIENT_ID";
/// OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "DRIVESYNC_CLIENT_SECRET";
/// API key.
pub const ENV_API_KEY: &str = "DRIVESYNC_API_KEY";
/// Sync source directory.
pub const ENV_SOURCE: &str = "DRIVESYNC_SOURCE";
/// Destination folder ID.
pub const ENV_FOLDER_ID: &str = "DRIVESYNC_FOLDER_ID";
/// Token file path.
pub const ENV_TOKEN_FILE: &str = "DRIVESYNC_TOKEN_FILE";
/// Log level.
pub const ENV_LOG_LEVEL: &str = "DRIVESYNC_LOG_LEVEL";

impl Config {
    /// Override file values with variables returned by `lookup`.
    ///
    /// Empty values are ignored so that `VAR=` does not wipe a configured value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CLIENT_ID) {
            self.auth.client_id = Some(v);
        }
        if let Some(v) = get(ENV_CLIENT_SECRET) {
            self.auth.client_secret = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.auth.api_key = Some(v);
        }
        if let Some(v) = get(ENV_SOURCE) {
            self.sync.source = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_FOLDER_ID) {
            self.sync.folder_id = Some(v);
        }
        if let Some(v) = get(ENV_TOKEN_FILE) {
            self.auth.token_file = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_LOG_LEVEL) {
            self.logging.level = v;
        }
    }

    /// [`Config::apply_env`] against the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Errors raised while turning configuration into runtime settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither an OAuth client nor an API key is configured
    #[error(
        "Missing credentials: set DRIVESYNC_CLIENT_ID and DRIVESYNC_CLIENT_SECRET (or DRIVESYNC_API_KEY)"
    )]
    MissingCredentials,

    /// One or more fields failed validation
    #[error("Invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// How requests to the remote store are authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Interactive OAuth2 authorization-code flow
    OAuth {
        client_id: String,
        client_secret: String,
    },
    /// Static API key
    ApiKey(String),
}

impl Config {
    /// Resolve the credential variant.
    ///
    /// An OAuth client (both id and secret) takes precedence over an API key.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

        match (
            non_empty(&self.auth.client_id),
            non_empty(&self.auth.client_secret),
        ) {
            (Some(client_id), Some(client_secret)) => Ok(Credentials::OAuth {
                client_id,
                client_secret,
            }),
            _ => non_empty(&self.auth.api_key)
                .map(Credentials::ApiKey)
                .ok_or(ConfigError::MissingCredentials),
        }
    }

    /// The destination folder as a validated [`RemoteId`].
    pub fn folder_id(&self) -> Result<RemoteId, ConfigError> {
        let raw = self.sync.folder_id.clone().unwrap_or_default();
        RemoteId::new(raw).map_err(|e| {
            ConfigError::Invalid(vec![ValidationError {
                field: "sync.folder_id".into(),
                message: e.to_string(),
            }])
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.folder_id"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Credentials are
    /// checked separately by [`Config::credentials`].
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.source.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.source".into(),
                message: format!("must be set (or export {ENV_SOURCE})"),
            });
        }
        match self.sync.folder_id.as_deref() {
            None | Some("") => errors.push(ValidationError {
                field: "sync.folder_id".into(),
                message: format!("must be set (or export {ENV_FOLDER_ID})"),
            }),
            Some(id) => {
                if let Err(e) = RemoteId::new(id.to_string()) {
                    errors.push(ValidationError {
                        field: "sync.folder_id".into(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // --- auth ---
        if self.auth.redirect_port == 0 {
            errors.push(ValidationError {
                field: "auth.redirect_port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.auth.scopes.is_empty() {
            errors.push(ValidationError {
                field: "auth.scopes".into(),
                message: "at least one scope is required".into(),
            });
        }
        if self.auth.token_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "auth.token_file".into(),
                message: "must be set".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }

    /// [`Config::validate`] folded into a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivesync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_source(PathBuf::from("/home/user/testsync"))
///     .sync_folder_id("1AbCdEfGhIjKlMnOp")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_source(mut self, source: PathBuf) -> Self {
        self.config.sync.source = source;
        self
    }

    pub fn sync_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.config.sync.folder_id = Some(folder_id.into());
        self
    }

    pub fn sync_max_concurrent(mut self, n: usize) -> Self {
        self.config.sync.max_concurrent = n;
        self
    }

    // --- auth ---

    pub fn auth_client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(id.into());
        self.config.auth.client_secret = Some(secret.into());
        self
    }

    pub fn auth_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.auth.api_key = Some(key.into());
        self
    }

    pub fn auth_token_file(mut self, path: PathBuf) -> Self {
        self.config.auth.token_file = path;
        self
    }

    pub fn auth_redirect_port(mut self, port: u16) -> Self {
        self.config.auth.redirect_port = port;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

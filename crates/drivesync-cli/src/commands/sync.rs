//! Sync command - Push the local source folder to Google Drive
//!
//! Provides the `drivesync sync` CLI command which:
//! 1. Merges command-line overrides into the configuration
//! 2. Resolves credentials (API key, or OAuth token from the token file,
//!    refreshing or re-authorizing when needed)
//! 3. Runs the SyncEngine and reports each file and the final summary
//!
//! Files that fail to upload are listed in the summary without changing the
//! exit status; only setup failures, the remote listing and the local walk
//! make the command fail.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use drivesync_core::config::{Config, Credentials};
use drivesync_core::domain::UpsertAction;
use drivesync_core::ports::{ISyncObserver, Tokens};
use drivesync_core::usecases::AuthenticateUseCase;
use drivesync_drive::client::{Credential, DriveClient};
use drivesync_drive::provider::DriveStore;
use drivesync_sync::engine::{SyncEngine, SyncResult};
use tracing::{info, warn};

use super::authenticate_usecase;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Sync command options
///
/// Per-file upload failures are reported but do not make the command exit
/// non-zero.
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Local folder to upload (overrides sync.source)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Destination folder ID (overrides sync.folder_id)
    #[arg(long)]
    pub folder_id: Option<String>,

    /// Maximum uploads in flight, 0 for unbounded (overrides sync.max_concurrent)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,
}

/// Prints one line per transfer
struct ConsoleObserver {
    formatter: Box<dyn OutputFormatter>,
}

impl ISyncObserver for ConsoleObserver {
    fn on_transfer_started(&self, name: &str, action: &UpsertAction) {
        let message = match action {
            UpsertAction::Create => format!("Uploading {name} to Google Drive..."),
            UpsertAction::Update(_) => format!("Updating {name} on Google Drive..."),
        };
        self.formatter.progress(
            &message,
            &serde_json::json!({"event": "started", "file": name, "action": action.as_str()}),
        );
    }

    fn on_transfer_finished(&self, name: &str, action: &UpsertAction) {
        self.formatter.progress(
            "",
            &serde_json::json!({"event": "finished", "file": name, "action": action.as_str()}),
        );
    }

    fn on_transfer_failed(&self, name: &str, error: &str) {
        self.formatter.error(&format!("{name}: {error}"));
    }
}

impl SyncCommand {
    /// Applies command-line overrides on top of file and environment values
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.sync.source = source.clone();
        }
        if let Some(folder_id) = &self.folder_id {
            config.sync.folder_id = Some(folder_id.clone());
        }
        if let Some(n) = self.max_concurrent {
            config.sync.max_concurrent = n;
        }
    }

    /// Execute the sync command
    ///
    /// Returns an error for fatal setup failures (configuration,
    /// credentials, remote listing, local walk).
    pub async fn execute(&self, mut config: Config, format: OutputFormat) -> Result<()> {
        self.apply_overrides(&mut config);
        let config = config.validated()?;
        let folder = config.folder_id()?;

        let store = resolve_authorization(&config).await?.into_store();
        let engine = SyncEngine::new(Arc::new(store), folder, config.sync.source.clone())
            .with_max_concurrent(config.sync.max_concurrent)
            .with_observer(Arc::new(ConsoleObserver {
                formatter: get_formatter(format),
            }));

        info!(
            source = %config.sync.source.display(),
            max_concurrent = config.sync.max_concurrent,
            dry_run = self.dry_run,
            "Starting sync"
        );

        self.run(&engine, format).await
    }

    /// Prints the plan, or runs it and prints the summary
    async fn run(&self, engine: &SyncEngine, format: OutputFormat) -> Result<()> {
        let json = format.is_json();
        let formatter = get_formatter(format);

        if self.dry_run {
            let plan = engine.plan().await?;
            if json {
                let entries: Vec<_> = plan
                    .iter()
                    .map(|p| {
                        serde_json::json!({"file": p.file.relative_name(), "action": p.action.as_str()})
                    })
                    .collect();
                formatter.print_json(&serde_json::json!({"dry_run": true, "files": entries}));
            } else {
                formatter.info("Dry run mode - no changes will be made");
                for p in &plan {
                    formatter.info(&format!("would {}: {}", p.action, p.file.relative_name()));
                }
                formatter.success(&format!("Dry run completed ({} files)", plan.len()));
            }
            return Ok(());
        }

        let result = engine.sync().await?;
        report(&result, &*formatter, json);
        Ok(())
    }
}

/// How this run is authorized against Drive
enum Authorization {
    ApiKey(String),
    /// Tokens plus the use case that renews them during the run
    OAuth {
        tokens: Tokens,
        auth: Arc<AuthenticateUseCase>,
    },
}

impl Authorization {
    fn into_store(self) -> DriveStore {
        match self {
            Authorization::ApiKey(key) => DriveStore::new(DriveClient::new(Credential::ApiKey(key))),
            Authorization::OAuth { tokens, auth } => {
                let client = DriveClient::new(Credential::Bearer(tokens.access_token.clone()));
                DriveStore::with_oauth(client, tokens, auth)
            }
        }
    }
}

/// Picks the configured credential, obtaining an OAuth token if needed
async fn resolve_authorization(config: &Config) -> Result<Authorization> {
    match config.credentials()? {
        Credentials::ApiKey(key) => {
            info!("Using API key credentials");
            Ok(Authorization::ApiKey(key))
        }
        Credentials::OAuth {
            client_id,
            client_secret,
        } => {
            let auth = Arc::new(authenticate_usecase(config, &client_id, &client_secret));
            let obtained = auth
                .obtain_tokens()
                .await
                .context("Failed to obtain an OAuth token")?;
            for note in &obtained.notes {
                warn!("{}", note);
            }
            info!(source = %obtained.source, "Using OAuth token");
            Ok(Authorization::OAuth {
                tokens: obtained.tokens,
                auth,
            })
        }
    }
}

fn report(result: &SyncResult, formatter: &dyn OutputFormatter, json: bool) {
    if json {
        let errors: Vec<_> = result
            .errors
            .iter()
            .map(|e| serde_json::json!({"file": e.name, "error": e.message}))
            .collect();
        formatter.print_json(&serde_json::json!({
            "files_created": result.files_created,
            "files_updated": result.files_updated,
            "errors": errors,
            "duration_ms": result.duration_ms,
        }));
        return;
    }

    let duration_display = if result.duration_ms >= 1000 {
        format!("{:.1}s", result.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", result.duration_ms)
    };

    formatter.progress("Sync complete.", &serde_json::Value::Null);
    formatter.success(&format!("Finished in {}", duration_display));
    formatter.info(&format!(
        "Created: {} file{}",
        result.files_created,
        if result.files_created == 1 { "" } else { "s" }
    ));
    formatter.info(&format!(
        "Updated: {} file{}",
        result.files_updated,
        if result.files_updated == 1 { "" } else { "s" }
    ));

    if !result.errors.is_empty() {
        formatter.error(&format!(
            "{} error{} occurred:",
            result.errors.len(),
            if result.errors.len() == 1 { "" } else { "s" }
        ));
        for err in &result.errors {
            formatter.info(&format!("  - {}", err));
        }
    }
}

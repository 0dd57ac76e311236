//! Config command - View and check drivesync configuration
//!
//! Provides the `drivesync config` CLI command which:
//! 1. Shows the effective configuration (file plus environment) with
//!    secrets masked
//! 2. Validates it and reports every problem at once

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use drivesync_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the effective configuration
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    ///
    /// `path` is the file the configuration was read from, or would have
    /// been read from when it does not exist.
    pub async fn execute(&self, config: Config, path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(config, path, format),
            ConfigCommand::Validate => self.execute_validate(&config, format),
        }
    }

    fn execute_show(&self, config: Config, path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = masked(config);

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            formatter.success(&format!("Configuration ({})", source_label(path)));
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_validate(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let mut problems: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
        if let Err(e) = config.credentials() {
            problems.push(e.to_string());
        }

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": problems.is_empty(),
                "errors": problems,
            }));
        } else if problems.is_empty() {
            formatter.success("Configuration is valid");
        } else {
            for problem in &problems {
                formatter.error(problem);
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{} configuration error(s)", problems.len())
        }
    }
}

fn source_label(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("defaults, {} not found", path.display())
    }
}

/// Replaces secrets with a fixed mask
fn masked(mut config: Config) -> Config {
    const MASK: &str = "********";
    if config.auth.client_secret.is_some() {
        config.auth.client_secret = Some(MASK.to_string());
    }
    if config.auth.api_key.is_some() {
        config.auth.api_key = Some(MASK.to_string());
    }
    config
}

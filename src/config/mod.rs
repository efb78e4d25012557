use crate::core::pipeline::{PipelineSettings, ProgressErrorPolicy};
use crate::core::ConfigProvider;
use crate::domain::model::{BackupKind, NotifyKind, StorageKind};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_kind, validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every flag falls back to an environment variable of the same meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "atlassian-backup"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Export a Jira or Confluence Cloud site and store the backup")
)]
pub struct CliConfig {
    /// Atlassian account name (email or username)
    #[cfg_attr(feature = "cli", arg(long, env = "ATLASSIAN_ACCOUNT"))]
    pub atlassian_account: String,

    /// Atlassian workspace name, as in {workspace}.atlassian.net
    #[cfg_attr(feature = "cli", arg(long, env = "ATLASSIAN_WORKSPACE"))]
    pub atlassian_workspace: String,

    /// Atlassian API token
    #[cfg_attr(feature = "cli", arg(long, env = "ATLASSIAN_TOKEN", hide_env_values = true))]
    pub atlassian_token: String,

    /// What to back up (jira or confluence)
    #[cfg_attr(feature = "cli", arg(long, env = "BACKUP_TYPE"))]
    pub backup_type: String,

    /// Where to save the backup (s3, gs or local)
    #[cfg_attr(feature = "cli", arg(long, env = "STORAGE_TYPE"))]
    pub storage_type: String,

    /// How to send notifications (slack)
    #[cfg_attr(feature = "cli", arg(long, env = "NOTIFY_TYPE"))]
    pub notify_type: String,

    /// Site URL override, defaults to https://{workspace}.atlassian.net
    #[cfg_attr(feature = "cli", arg(long, env = "ATLASSIAN_BASE_URL"))]
    pub base_url: Option<String>,

    #[cfg_attr(
        feature = "cli",
        arg(long, env = "POLL_INTERVAL_SECS", default_value = "60")
    )]
    pub poll_interval_secs: u64,

    /// Fail the run on the first progress query error instead of polling again
    #[cfg_attr(
        feature = "cli",
        arg(
            long,
            env = "ABORT_ON_POLL_ERROR",
            value_parser = clap::builder::BoolishValueParser::new()
        )
    )]
    pub abort_on_poll_error: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Enable verbose output"))]
    pub verbose: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Emit logs as JSON"))]
    pub log_json: bool,
}

impl CliConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            on_progress_error: if self.abort_on_poll_error {
                ProgressErrorPolicy::Abort
            } else {
                ProgressErrorPolicy::Tolerate
            },
        }
    }
}

impl ConfigProvider for CliConfig {
    fn atlassian_account(&self) -> &str {
        &self.atlassian_account
    }

    fn atlassian_workspace(&self) -> &str {
        &self.atlassian_workspace
    }

    fn atlassian_token(&self) -> &str {
        &self.atlassian_token
    }

    fn backup_type(&self) -> &str {
        &self.backup_type
    }

    fn storage_type(&self) -> &str {
        &self.storage_type
    }

    fn notify_type(&self) -> &str {
        &self.notify_type
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("atlassian_account", &self.atlassian_account)?;
        validate_non_empty_string("atlassian_workspace", &self.atlassian_workspace)?;
        validate_non_empty_string("atlassian_token", &self.atlassian_token)?;

        validate_kind::<BackupKind>("backup_type", &self.backup_type)?;
        validate_kind::<StorageKind>("storage_type", &self.storage_type)?;
        validate_kind::<NotifyKind>("notify_type", &self.notify_type)?;

        if let Some(base_url) = &self.base_url {
            validate_url("base_url", base_url)?;
        }
        validate_positive_number("poll_interval_secs", self.poll_interval_secs as usize, 1)?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

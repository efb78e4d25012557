use crate::domain::model::{ArtifactDestination, DownloadLocation, Progress, TransferSize};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Remote export job: trigger it, follow it, and locate the finished artifact.
#[async_trait]
pub trait BackupSource: Send + Sync {
    /// Starts the export. A non-empty response body is treated as an error message.
    async fn run(&self) -> Result<()>;

    /// Current completion percentage.
    async fn progress(&self) -> Result<Progress>;

    /// Download address of the artifact. Only meaningful once `progress` reported 100.
    async fn file(&self) -> Result<DownloadLocation>;
}

/// Durable destination for the downloaded artifact.
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn save(
        &self,
        source: &DownloadLocation,
        destination: &ArtifactDestination,
    ) -> Result<TransferSize>;
}

/// Operator-facing notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Finished run settings, whatever produced them.
pub trait ConfigProvider: Send + Sync {
    fn atlassian_account(&self) -> &str;
    fn atlassian_workspace(&self) -> &str;
    fn atlassian_token(&self) -> &str;
    fn backup_type(&self) -> &str;
    fn storage_type(&self) -> &str;
    fn notify_type(&self) -> &str;
    /// Overrides `https://{workspace}.atlassian.net`.
    fn base_url(&self) -> Option<&str>;
}

use super::{fetch, transfer_error};
use crate::domain::model::{ArtifactDestination, DownloadLocation, TransferSize};
use crate::domain::ports::StorageSink;
use crate::utils::error::{BackupError, Result, ResultExt};
use crate::utils::validation::validate_path;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub const LOCAL_FOLDER_ENV: &str = "LOCAL_FOLDER";

/// Backup files on the local filesystem, under `LOCAL_FOLDER`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    client: Client,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            client: Client::new(),
        }
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let folder = lookup(LOCAL_FOLDER_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackupError::ClientInitError {
                message: "Local folder is not specified (LOCAL_FOLDER)".to_string(),
            })?;
        validate_path(LOCAL_FOLDER_ENV, &folder)?;
        Ok(Self::new(folder))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn write(&self, location: &DownloadLocation, full_path: &Path) -> Result<u64> {
        let mut response = fetch(&self.client, location).await?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(full_path).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(transfer_error)? {
            file.write_all(&chunk).await.map_err(transfer_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(transfer_error)?;

        Ok(written)
    }
}

#[async_trait]
impl StorageSink for LocalStorage {
    async fn save(
        &self,
        source: &DownloadLocation,
        destination: &ArtifactDestination,
    ) -> Result<TransferSize> {
        let full_path = self.base_path.join(destination.as_str());
        tracing::debug!("Saving backup to {}", full_path.display());

        let written = self
            .write(source, &full_path)
            .await
            .wrap_err("can't save backup to folder")?;

        Ok(TransferSize(written))
    }
}

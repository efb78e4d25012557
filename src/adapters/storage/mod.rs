pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use crate::domain::model::DownloadLocation;
use crate::utils::error::{BackupError, Result};
use reqwest::{Client, Response};

/// Opens the artifact download. The body is left unread so sinks can stream it.
pub async fn fetch(client: &Client, location: &DownloadLocation) -> Result<Response> {
    tracing::debug!("Downloading backup file from {}", location);

    let response = client
        .get(location.as_url().clone())
        .send()
        .await
        .map_err(|e| BackupError::FetchError {
            message: format!("GET {} failed: {}", location, e.without_url()),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackupError::FetchError {
            message: format!("GET {} returned status {}", location, status),
        });
    }

    Ok(response)
}

pub(crate) fn transfer_error(e: impl std::fmt::Display) -> BackupError {
    BackupError::TransferError {
        message: e.to_string(),
    }
}

//! Export-job driver shared by every Atlassian product.
//!
//! The products expose the same trigger → poll → download shape and only
//! differ in paths, response field names and how the result identifier is
//! encoded, so each one is a [`ProviderProfile`] fed to [`PollingSource`].

pub mod confluence;
pub mod jira;

use crate::adapters::http::ApiClient;
use crate::domain::model::{BackupKind, DownloadLocation, Progress};
use crate::domain::ports::BackupSource;
use crate::utils::error::{BackupError, Result, ResultExt};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Export request body: include attachments, export to cloud format.
pub const BACKUP_REQUEST_BODY: &str = r#"{"cbAttachments":"true","exportToCloud":"true"}"#;

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,3}").expect("percent pattern"));

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z0-9]{8}-[a-z0-9]{4}-[a-z0-9]{4}-[a-z0-9]{4}-[a-z0-9]{12}")
        .expect("uuid pattern")
});

/// How the progress response reports completion.
#[derive(Debug, Clone, Copy)]
pub enum ProgressField {
    /// JSON number, e.g. `"progress": 42`.
    Numeric(&'static str),
    /// Free text, e.g. `"alternativePercentage": "42% complete"`.
    FreeText(&'static str),
}

/// Normalization applied to the result field before addressing the download.
#[derive(Debug, Clone, Copy)]
pub enum ResultExtractor {
    Verbatim,
    Uuid,
}

/// Where the result identifier goes in the download address.
#[derive(Debug, Clone, Copy)]
pub enum DownloadAddress {
    /// `{download_path}?{param}={id}`
    Query(&'static str),
    /// `{download_path}{id}`
    PathSuffix,
}

#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub kind: BackupKind,
    pub trigger_path: &'static str,
    pub progress_path: &'static str,
    pub download_path: &'static str,
    /// Lookup for the most recent job id, for products whose progress endpoint needs one.
    pub last_task_path: Option<&'static str>,
    pub task_query_param: &'static str,
    pub progress_field: ProgressField,
    pub result_field: &'static str,
    pub result_extractor: ResultExtractor,
    pub download_address: DownloadAddress,
}

pub fn profile_for(kind: BackupKind) -> ProviderProfile {
    match kind {
        BackupKind::Jira => jira::profile(),
        BackupKind::Confluence => confluence::profile(),
    }
}

/// First run of 1-3 digits in free text, as a percentage.
pub fn extract_percent(text: &str) -> Result<Progress> {
    let digits = PERCENT_RE
        .find(text)
        .ok_or_else(|| BackupError::ParseError {
            message: format!("no percentage found in {:?}", text),
        })?
        .as_str();

    let value: u64 = digits.parse().map_err(|e| BackupError::ParseError {
        message: format!("invalid percentage {:?}: {}", digits, e),
    })?;
    Progress::new(value)
}

/// The UUID-shaped substring embedded in a provider result string.
pub fn extract_uuid(text: &str) -> Result<String> {
    UUID_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| BackupError::ParseError {
            message: format!("no file id found in {:?}", text),
        })
}

pub struct PollingSource {
    api: ApiClient,
    profile: ProviderProfile,
}

impl PollingSource {
    pub fn new(api: ApiClient, profile: ProviderProfile) -> Self {
        Self { api, profile }
    }

    pub fn kind(&self) -> BackupKind {
        self.profile.kind
    }

    async fn last_task_id(&self) -> Result<Option<String>> {
        let Some(path) = self.profile.last_task_path else {
            return Ok(None);
        };

        let body = self.api.get(path, &[]).await.wrap_err("can't get last task ID")?;
        let task_id = body.trim().trim_matches('"').to_string();
        if task_id.is_empty() {
            return Err(BackupError::ParseError {
                message: "last task ID response is empty".to_string(),
            }
            .context("can't get last task ID"));
        }
        Ok(Some(task_id))
    }

    async fn progress_response(&self) -> Result<Value> {
        let task_id = self.last_task_id().await?;
        let query: Vec<(&str, &str)> = task_id
            .as_deref()
            .map(|id| vec![(self.profile.task_query_param, id)])
            .unwrap_or_default();

        let body = self.api.get(self.profile.progress_path, &query).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn read_progress(&self, response: &Value) -> Result<Progress> {
        match self.profile.progress_field {
            ProgressField::Numeric(field) => {
                let value = response.get(field).and_then(Value::as_u64).ok_or_else(|| {
                    BackupError::ParseError {
                        message: format!("missing numeric field {:?} in progress response", field),
                    }
                })?;
                Progress::new(value)
            }
            ProgressField::FreeText(field) => {
                let text = response.get(field).and_then(Value::as_str).ok_or_else(|| {
                    BackupError::ParseError {
                        message: format!("missing text field {:?} in progress response", field),
                    }
                })?;
                extract_percent(text)
            }
        }
    }

    fn read_result(&self, response: &Value) -> Result<String> {
        let field = self.profile.result_field;
        let raw = response
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackupError::ParseError {
                message: format!("missing field {:?} in progress response", field),
            })?;

        match self.profile.result_extractor {
            ResultExtractor::Verbatim => Ok(raw.to_string()),
            ResultExtractor::Uuid => extract_uuid(raw),
        }
    }
}

#[async_trait]
impl BackupSource for PollingSource {
    async fn run(&self) -> Result<()> {
        let result: Result<()> = async {
            let body = self
                .api
                .post(self.profile.trigger_path, BACKUP_REQUEST_BODY)
                .await?;

            // 成功時回應為空，任何內容（包含空白）即為錯誤訊息
            if !body.is_empty() {
                return Err(BackupError::TriggerError { message: body });
            }
            Ok(())
        }
        .await;

        result.wrap_err("can't run backup")
    }

    async fn progress(&self) -> Result<Progress> {
        let result: Result<Progress> = async {
            let response = self.progress_response().await?;
            self.read_progress(&response)
        }
        .await;

        result.wrap_err("can't get backup progress")
    }

    async fn file(&self) -> Result<DownloadLocation> {
        let result: Result<DownloadLocation> = async {
            let response = self.progress_response().await?;
            let file_id = self.read_result(&response)?;

            let url = match self.profile.download_address {
                DownloadAddress::Query(param) => self
                    .api
                    .url_with_credentials(self.profile.download_path, &[(param, file_id.as_str())])?,
                DownloadAddress::PathSuffix => {
                    let path = format!("{}{}", self.profile.download_path, file_id);
                    self.api.url_with_credentials(&path, &[])?
                }
            };
            Ok(DownloadLocation::new(url))
        }
        .await;

        result.wrap_err("can't get backup file URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_percent() {
        assert_eq!(extract_percent("42% done").unwrap().percent(), 42);
        assert_eq!(extract_percent("7").unwrap().percent(), 7);
        assert_eq!(extract_percent("100% complete").unwrap().percent(), 100);
        assert_eq!(extract_percent("Estimated 0%").unwrap().percent(), 0);
    }

    #[test]
    fn test_extract_percent_without_digits() {
        let err = extract_percent("in progress").unwrap_err();
        assert!(matches!(err, BackupError::ParseError { .. }));
        assert!(matches!(extract_percent(""), Err(BackupError::ParseError { .. })));
    }

    #[test]
    fn test_extract_percent_takes_first_run() {
        // 只取第一段 1-3 位數字
        assert_eq!(extract_percent("step 3 of 12: 40%").unwrap().percent(), 3);
        assert!(matches!(
            extract_percent("250% complete"),
            Err(BackupError::ParseError { .. })
        ));
    }

    #[test]
    fn test_extract_uuid() {
        let id = "1c9e4f6a-3b2d-4e8f-9a1b-0c2d3e4f5a6b";
        assert_eq!(extract_uuid(id).unwrap(), id);
        assert_eq!(
            extract_uuid(&format!("export/download/?fileId={}&x=1", id)).unwrap(),
            id
        );
        assert_eq!(
            extract_uuid(&format!("prefix{}suffix-with-dashes", id)).unwrap(),
            id
        );
        assert!(matches!(
            extract_uuid("no id here"),
            Err(BackupError::ParseError { .. })
        ));
    }
}

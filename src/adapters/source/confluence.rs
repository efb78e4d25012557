use super::{DownloadAddress, ProgressField, ProviderProfile, ResultExtractor};
use crate::domain::model::BackupKind;

const BACKUP_PATH: &str = "/wiki/rest/obm/1.0/runbackup";
const PROGRESS_PATH: &str = "/wiki/rest/obm/1.0/getprogress";
const DOWNLOAD_PATH: &str = "/wiki/download/";

/// Confluence Cloud reports progress as text ("42% complete") and the
/// finished file name is appended to the download path as-is.
pub fn profile() -> ProviderProfile {
    ProviderProfile {
        kind: BackupKind::Confluence,
        trigger_path: BACKUP_PATH,
        progress_path: PROGRESS_PATH,
        download_path: DOWNLOAD_PATH,
        last_task_path: None,
        task_query_param: "taskId",
        progress_field: ProgressField::FreeText("alternativePercentage"),
        result_field: "fileName",
        result_extractor: ResultExtractor::Verbatim,
        download_address: DownloadAddress::PathSuffix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::{ApiClient, Credentials};
    use crate::adapters::source::PollingSource;
    use crate::domain::ports::BackupSource;
    use crate::utils::error::BackupError;
    use httpmock::prelude::*;
    use url::Url;

    fn source(server: &MockServer) -> PollingSource {
        let api = ApiClient::new(
            Url::parse(&server.base_url()).unwrap(),
            Credentials {
                account: "admin".to_string(),
                token: "secret".to_string(),
            },
        );
        PollingSource::new(api, profile())
    }

    #[tokio::test]
    async fn test_progress_from_free_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path(PROGRESS_PATH);
            then.status(200).json_body(serde_json::json!({
                "alternativePercentage": "67%",
                "currentStatus": "Exporting attachments",
            }));
        });

        let value = source(&server).progress().await.unwrap();
        assert_eq!(value.percent(), 67);
        mock.assert();
    }

    #[tokio::test]
    async fn test_progress_without_digits_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(PROGRESS_PATH);
            then.status(200)
                .json_body(serde_json::json!({"alternativePercentage": "Preparing"}));
        });

        let err = source(&server).progress().await.unwrap_err();
        assert!(err.to_string().starts_with("can't get backup progress"));
        assert!(matches!(err.root(), BackupError::ParseError { .. }));
    }

    #[tokio::test]
    async fn test_file_appends_file_name() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(PROGRESS_PATH);
            then.status(200).json_body(serde_json::json!({
                "alternativePercentage": "100%",
                "fileName": "temp/filestore/Confluence-backup.zip",
            }));
        });

        let location = source(&server).file().await.unwrap();
        assert_eq!(
            location.as_url().path(),
            "/wiki/download/temp/filestore/Confluence-backup.zip"
        );
        assert!(!location.to_string().contains("secret"));
    }
}

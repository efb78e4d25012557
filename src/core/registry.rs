use crate::adapters::http::{ApiClient, Credentials};
use crate::adapters::notify::slack::SlackNotifier;
use crate::adapters::source::{profile_for, PollingSource};
use crate::adapters::storage::local::LocalStorage;
use crate::domain::model::{BackupKind, NotifyKind, StorageKind};
use crate::domain::ports::{BackupSource, ConfigProvider, Notifier, StorageSink};
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Reads backend-specific settings (`LOCAL_FOLDER`, `SLACK_WEBHOOK_URL`, ...).
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves storage and notification backends on demand.
///
/// Resolution happens at the point of use, so a missing backend setting
/// surfaces as a stage failure rather than at startup.
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    fn storage_name(&self) -> &str;
    fn notify_name(&self) -> &str;
    async fn storage(&self) -> Result<Box<dyn StorageSink>>;
    fn notifier(&self) -> Result<Box<dyn Notifier>>;
}

/// Builds the export-job source selected by `backup_type`.
pub fn build_source<C: ConfigProvider + ?Sized>(config: &C) -> Result<(BackupKind, Box<dyn BackupSource>)> {
    let kind: BackupKind = config.backup_type().parse()?;

    let base_url = match config.base_url() {
        Some(raw) => Url::parse(raw).map_err(|e| BackupError::InvalidConfigValueError {
            field: "base_url".to_string(),
            value: raw.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?,
        None => ApiClient::workspace_url(config.atlassian_workspace())?,
    };

    let api = ApiClient::new(
        base_url,
        Credentials {
            account: config.atlassian_account().to_string(),
            token: config.atlassian_token().to_string(),
        },
    );

    Ok((kind, Box::new(PollingSource::new(api, profile_for(kind)))))
}

/// Factory keyed by the configured kind strings.
#[derive(Clone)]
pub struct Registry {
    storage_type: String,
    notify_type: String,
    lookup: EnvLookup,
}

impl Registry {
    pub fn new<C: ConfigProvider + ?Sized>(config: &C, lookup: EnvLookup) -> Self {
        Self {
            storage_type: config.storage_type().to_string(),
            notify_type: config.notify_type().to_string(),
            lookup,
        }
    }

    pub fn from_env<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(config, Arc::new(|key: &str| std::env::var(key).ok()))
    }
}

#[async_trait]
impl ComponentFactory for Registry {
    fn storage_name(&self) -> &str {
        &self.storage_type
    }

    fn notify_name(&self) -> &str {
        &self.notify_type
    }

    async fn storage(&self) -> Result<Box<dyn StorageSink>> {
        let kind: StorageKind = self.storage_type.parse()?;
        let lookup = self.lookup.as_ref();

        match kind {
            StorageKind::Local => Ok(Box::new(LocalStorage::from_lookup(lookup)?)),
            #[cfg(feature = "s3")]
            StorageKind::S3 => {
                use crate::adapters::storage::s3::{S3Settings, S3Storage};
                let settings = S3Settings::from_lookup(lookup)?;
                Ok(Box::new(S3Storage::from_settings(settings).await))
            }
            #[cfg(not(feature = "s3"))]
            StorageKind::S3 => Err(BackupError::UnsupportedKind {
                kind: "storage".to_string(),
                value: "s3 (built without the `s3` feature)".to_string(),
            }),
        }
    }

    fn notifier(&self) -> Result<Box<dyn Notifier>> {
        let kind: NotifyKind = self.notify_type.parse()?;
        let lookup = self.lookup.as_ref();

        match kind {
            NotifyKind::Slack => Ok(Box::new(SlackNotifier::from_lookup(lookup)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockConfig {
        backup_type: String,
        storage_type: String,
        notify_type: String,
        base_url: Option<String>,
    }

    impl MockConfig {
        fn new(backup: &str, storage: &str, notify: &str) -> Self {
            Self {
                backup_type: backup.to_string(),
                storage_type: storage.to_string(),
                notify_type: notify.to_string(),
                base_url: None,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn atlassian_account(&self) -> &str {
            "admin@example.com"
        }

        fn atlassian_workspace(&self) -> &str {
            "acme"
        }

        fn atlassian_token(&self) -> &str {
            "token"
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

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> EnvLookup {
        Arc::new(move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_build_source_known_kinds() {
        let (kind, _) = build_source(&MockConfig::new("jira", "local", "slack")).unwrap();
        assert_eq!(kind, BackupKind::Jira);
        let (kind, _) = build_source(&MockConfig::new("confluence", "local", "slack")).unwrap();
        assert_eq!(kind, BackupKind::Confluence);
    }

    #[test]
    fn test_build_source_unknown_kind_is_typed_error() {
        let err = build_source(&MockConfig::new("trello", "local", "slack"))
            .err()
            .unwrap();
        match err {
            BackupError::UnsupportedKind { kind, value } => {
                assert_eq!(kind, "backup");
                assert_eq!(value, "trello");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_build_source_rejects_bad_base_url() {
        let mut config = MockConfig::new("jira", "local", "slack");
        config.base_url = Some("not a url".to_string());
        assert!(matches!(
            build_source(&config).err().unwrap(),
            BackupError::InvalidConfigValueError { .. }
        ));
    }

    #[tokio::test]
    async fn test_storage_resolution() {
        let config = MockConfig::new("jira", "local", "slack");
        let registry = Registry::new(&config, lookup(&[("LOCAL_FOLDER", "/tmp/backups")]));
        assert!(registry.storage().await.is_ok());
        assert_eq!(registry.storage_name(), "local");

        let registry = Registry::new(&config, lookup(&[]));
        let err = registry.storage().await.err().unwrap();
        assert!(matches!(err, BackupError::ClientInitError { .. }));

        let config = MockConfig::new("jira", "ftp", "slack");
        let registry = Registry::new(&config, lookup(&[]));
        let err = registry.storage().await.err().unwrap();
        assert!(matches!(err, BackupError::UnsupportedKind { .. }));
    }

    #[test]
    fn test_notifier_resolution() {
        let config = MockConfig::new("jira", "local", "slack");
        let registry = Registry::new(
            &config,
            lookup(&[("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/x")]),
        );
        assert!(registry.notifier().is_ok());

        let registry = Registry::new(&config, lookup(&[]));
        assert!(matches!(
            registry.notifier().err().unwrap(),
            BackupError::ConfigurationError { .. }
        ));

        let config = MockConfig::new("jira", "local", "email");
        let registry = Registry::new(&config, lookup(&[]));
        assert!(matches!(
            registry.notifier().err().unwrap(),
            BackupError::UnsupportedKind { .. }
        ));
    }
}

use crate::utils::error::{BackupError, Result};
use std::str::FromStr;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(BackupError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Checks that `value` names a supported backend kind.
pub fn validate_kind<K>(field_name: &str, value: &str) -> Result<()>
where
    K: FromStr<Err = BackupError>,
{
    value
        .parse::<K>()
        .map(|_| ())
        .map_err(|e| BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BackupKind, StorageKind};

    #[test]
    fn test_validate_url() {
        assert!(validate_url("base_url", "https://example.com").is_ok());
        assert!(validate_url("base_url", "http://example.com").is_ok());
        assert!(validate_url("base_url", "").is_err());
        assert!(validate_url("base_url", "invalid-url").is_err());
        assert!(validate_url("base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("LOCAL_FOLDER", "/var/backups").is_ok());
        assert!(validate_path("LOCAL_FOLDER", "").is_err());
        assert!(validate_path("LOCAL_FOLDER", "/var/\0backups").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("poll_interval_secs", 60, 1).is_ok());
        assert!(validate_positive_number("poll_interval_secs", 0, 1).is_err());
    }

    #[test]
    fn test_validate_kind() {
        assert!(validate_kind::<BackupKind>("backup_type", "jira").is_ok());
        assert!(validate_kind::<StorageKind>("storage_type", "local").is_ok());
        assert!(validate_kind::<StorageKind>("storage_type", "gs").is_ok());

        match validate_kind::<StorageKind>("storage_type", "azure") {
            Err(BackupError::InvalidConfigValueError { field, reason, .. }) => {
                assert_eq!(field, "storage_type");
                assert_eq!(reason, "Unsupported storage type: azure");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Trigger error: {message}")]
    TriggerError { message: String },

    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}: {body}")]
    HttpStatusError {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Fetch error: {message}")]
    FetchError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Client init error: {message}")]
    ClientInitError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported {kind} type: {value}")]
    UnsupportedKind { kind: String, value: String },

    #[error("Transfer error: {message}")]
    TransferError { message: String },

    #[error("Delivery error: {message}")]
    DeliveryError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<BackupError>,
    },
}

impl BackupError {
    /// Prefixes the error with a description of the step that produced it.
    pub fn context(self, context: impl Into<String>) -> Self {
        BackupError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers.
    pub fn root(&self) -> &BackupError {
        match self {
            BackupError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

/// `?`-friendly context for results, in the spirit of `anyhow::Context`.
pub trait ResultExt<T> {
    fn wrap_err(self, context: &str) -> Result<T>;
}

impl<T, E: Into<BackupError>> ResultExt<T> for std::result::Result<T, E> {
    fn wrap_err(self, context: &str) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prefixes_message() {
        let err = BackupError::ParseError {
            message: "no digits in \"n/a\"".to_string(),
        }
        .context("can't get backup progress");

        assert_eq!(
            err.to_string(),
            "can't get backup progress: Parse error: no digits in \"n/a\""
        );
        assert!(matches!(err.root(), BackupError::ParseError { .. }));
    }

    #[test]
    fn test_wrap_err_on_result() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.wrap_err("can't save backup to folder").unwrap_err();
        assert!(err.to_string().starts_with("can't save backup to folder: IO error"));
        assert!(matches!(err.root(), BackupError::IoError(_)));
    }
}

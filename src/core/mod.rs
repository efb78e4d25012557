pub mod engine;
pub mod pipeline;
pub mod registry;

pub use crate::domain::model::{ArtifactDestination, BackupKind, DownloadLocation, Progress, TransferSize};
pub use crate::domain::ports::{BackupSource, ConfigProvider, Notifier, StorageSink};
pub use crate::utils::error::Result;

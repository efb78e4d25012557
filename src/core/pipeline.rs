use crate::core::registry::ComponentFactory;
use crate::domain::model::{ArtifactDestination, BackupKind, Progress, TransferSize};
use crate::domain::ports::BackupSource;
use crate::utils::error::BackupError;
use chrono::Local;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Run lifecycle. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Triggered,
    Polling,
    Completed,
    Transferring,
    Notified,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Notified | PipelineState::Failed)
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Triggered)
            | (Triggered, Polling)
            | (Polling, Polling)
            | (Polling, Completed)
            | (Completed, Transferring)
            | (Transferring, Notified) => true,
            _ => false,
        }
    }
}

/// Step of the run an error came from; its `Display` is the operator-facing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    StartBackup,
    FollowProgress,
    GetFileUrl,
    InitStorage,
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = match self {
            Stage::StartBackup => "start backup failure",
            Stage::FollowProgress => "follow progress failure",
            Stage::GetFileUrl => "get file URL failure",
            Stage::InitStorage => "init storage failure",
            Stage::Save => "save failure",
        };
        f.write_str(context)
    }
}

/// A terminal run failure. Formats as the message sent to the operator.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub provider: BackupKind,
    pub error: BackupError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.stage, self.provider.title(), self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// What to do when a progress query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressErrorPolicy {
    /// Log a warning and poll again after the interval.
    #[default]
    Tolerate,
    /// Fail the run with "follow progress failure".
    Abort,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poll_interval: Duration,
    pub on_progress_error: ProgressErrorPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            on_progress_error: ProgressErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub provider: BackupKind,
    pub destination: ArtifactDestination,
    pub size: TransferSize,
    /// Number of progress queries, failed ones included.
    pub polls: u32,
    pub message: String,
    /// Set when the artifact was saved but the success message could not be delivered.
    pub notify_error: Option<String>,
}

pub fn success_message(provider: BackupKind, size: &TransferSize) -> String {
    format!(
        "Backup {} successfully saved! Backup size is: {}",
        provider.title(),
        size
    )
}

/// Drives one export: trigger, poll, transfer, notify.
pub struct BackupPipeline<F: ComponentFactory> {
    provider: BackupKind,
    source: Box<dyn BackupSource>,
    factory: F,
    settings: PipelineSettings,
    state: PipelineState,
}

impl<F: ComponentFactory> BackupPipeline<F> {
    pub fn new(
        provider: BackupKind,
        source: Box<dyn BackupSource>,
        factory: F,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            source,
            factory,
            settings,
            state: PipelineState::Idle,
        }
    }

    pub fn provider(&self) -> BackupKind {
        self.provider
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("Pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, stage: Stage, error: BackupError) -> PipelineFailure {
        self.transition(PipelineState::Failed);
        PipelineFailure {
            stage,
            provider: self.provider,
            error,
        }
    }

    pub async fn run(&mut self) -> Result<BackupReport, PipelineFailure> {
        let title = self.provider.title();
        let destination = ArtifactDestination::new(self.provider, &Local::now());

        // 1. 觸發備份
        tracing::info!("Start {} cloud backup process", title);
        if let Err(e) = self.source.run().await {
            return Err(self.fail(Stage::StartBackup, e));
        }
        self.transition(PipelineState::Triggered);

        // 2. 輪詢進度，直到 100%
        self.transition(PipelineState::Polling);
        let polls = self.poll_until_complete().await?;
        self.transition(PipelineState::Completed);

        tracing::info!(
            "{} cloud backup success. Downloading backup file to {} storage...",
            title,
            self.factory.storage_name()
        );

        // 3. 取得下載位置並存入儲存後端
        let location = match self.source.file().await {
            Ok(location) => location,
            Err(e) => return Err(self.fail(Stage::GetFileUrl, e)),
        };
        tracing::debug!("Backup file location: {}", location);

        let storage = match self.factory.storage().await {
            Ok(storage) => storage,
            Err(e) => {
                let e = e.context(format!(
                    "can't initialize {} storage",
                    self.factory.storage_name()
                ));
                return Err(self.fail(Stage::InitStorage, e));
            }
        };

        self.transition(PipelineState::Transferring);
        let size = match storage.save(&location, &destination).await {
            Ok(size) => size,
            Err(e) => return Err(self.fail(Stage::Save, e)),
        };

        // 4. 通知成功；備份已存好，通知失敗不影響結果
        let message = success_message(self.provider, &size);
        let notified = match self.factory.notifier() {
            Ok(notifier) => notifier.send(&message).await,
            Err(e) => Err(e.context(format!(
                "can't create {} notifier",
                self.factory.notify_name()
            ))),
        };
        let notify_error = notified.err().map(|e| {
            tracing::error!(
                "Backup {} saved to {} but the success notification failed: {}",
                title,
                destination,
                e
            );
            e.to_string()
        });

        self.transition(PipelineState::Notified);
        tracing::info!("{}", message);

        Ok(BackupReport {
            provider: self.provider,
            destination,
            size,
            polls,
            message,
            notify_error,
        })
    }

    async fn poll_until_complete(&mut self) -> Result<u32, PipelineFailure> {
        let mut polls = 0u32;
        let mut last: Option<Progress> = None;

        loop {
            polls += 1;
            match self.source.progress().await {
                Ok(progress) => {
                    tracing::info!(
                        "Current backup {} progress is: {}",
                        self.provider,
                        progress
                    );
                    if let Some(previous) = last.filter(|previous| progress < *previous) {
                        tracing::warn!(
                            "Backup {} progress went back from {} to {}",
                            self.provider,
                            previous,
                            progress
                        );
                    }
                    last = Some(progress);

                    if progress.is_complete() {
                        return Ok(polls);
                    }
                }
                Err(e) => match self.settings.on_progress_error {
                    ProgressErrorPolicy::Abort => {
                        return Err(self.fail(Stage::FollowProgress, e));
                    }
                    ProgressErrorPolicy::Tolerate => {
                        tracing::warn!(
                            "Follow backup {} process failure, polling again in {:?}: {}",
                            self.provider,
                            self.settings.poll_interval,
                            e
                        );
                    }
                },
            }

            tokio::time::sleep(self.settings.poll_interval).await;
            self.transition(PipelineState::Polling);
        }
    }
}

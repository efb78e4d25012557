use crate::core::pipeline::{BackupPipeline, BackupReport, PipelineFailure};
use crate::core::registry::ComponentFactory;
use crate::utils::error::{BackupError, Result};

/// Result of a whole invocation, after the failure path has run.
#[derive(Debug)]
pub enum RunOutcome {
    Succeeded(BackupReport),
    Failed {
        failure: PipelineFailure,
        /// `Err` when the failure notification could not be sent.
        notification: Result<()>,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Succeeded(_) => 0,
            RunOutcome::Failed {
                notification: Ok(()),
                ..
            } => 1,
            RunOutcome::Failed { .. } => 2,
        }
    }
}

/// Single decision point for a run: on failure it notifies once through a
/// freshly resolved notifier and hands the outcome back to the caller.
pub struct BackupEngine<F: ComponentFactory> {
    pipeline: BackupPipeline<F>,
}

impl<F: ComponentFactory> BackupEngine<F> {
    pub fn new(pipeline: BackupPipeline<F>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &BackupPipeline<F> {
        &self.pipeline
    }

    pub async fn run(&mut self) -> RunOutcome {
        match self.pipeline.run().await {
            Ok(report) => RunOutcome::Succeeded(report),
            Err(failure) => {
                let notification = notify_failure(self.pipeline.factory(), &failure).await;
                RunOutcome::Failed {
                    failure,
                    notification,
                }
            }
        }
    }
}

/// Sends the failure message. No retry: a second failure is only reported back.
pub async fn notify_failure<F: ComponentFactory + ?Sized>(
    factory: &F,
    failure: &PipelineFailure,
) -> Result<()> {
    let notifier = factory.notifier().map_err(|e| {
        e.context(format!("Can't create {} notifier object", factory.notify_name()))
    })?;

    notifier.send(&failure.to_string()).await.map_err(|e: BackupError| {
        e.context(format!("Can't send notification to {}", factory.notify_name()))
    })
}

use atlassian_backup::utils::{logger, validation::Validate};
use atlassian_backup::{build_source, BackupEngine, BackupPipeline, CliConfig, Registry, RunOutcome};
use clap::Parser;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose, config.log_json);

    tracing::info!("Starting atlassian-backup");
    if config.verbose {
        tracing::debug!(
            backup_type = %config.backup_type,
            storage_type = %config.storage_type,
            notify_type = %config.notify_type,
            workspace = %config.atlassian_workspace,
            "CLI config loaded"
        );
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let (kind, source) = match build_source(&config) {
        Ok(built) => built,
        Err(e) => {
            tracing::error!("❌ Can't create {} backup source: {}", config.backup_type, e);
            std::process::exit(1);
        }
    };

    let registry = Registry::from_env(&config);
    let pipeline = BackupPipeline::new(kind, source, registry, config.pipeline_settings());
    let mut engine = BackupEngine::new(pipeline);

    let outcome = engine.run().await;
    match &outcome {
        RunOutcome::Succeeded(report) => {
            tracing::info!("✅ Backup saved to {}", report.destination);
        }
        RunOutcome::Failed {
            failure,
            notification,
        } => {
            if let Err(e) = notification {
                tracing::error!("❌ {}", e);
            }
            tracing::error!("❌ {}", failure);
        }
    }

    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
}

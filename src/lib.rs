pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::CliConfig;
pub use core::engine::{BackupEngine, RunOutcome};
pub use core::pipeline::{BackupPipeline, PipelineSettings, ProgressErrorPolicy};
pub use core::registry::{build_source, ComponentFactory, Registry};
pub use utils::error::{BackupError, Result};

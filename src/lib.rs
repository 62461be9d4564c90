use std::sync::Arc;

use self::cli::{Cli, Command};
use self::hook::{EnqueueHook, EnqueueOutcome};
use self::jobs_manager::{ApplyOutcome, JobsManager};
use self::owner::ManifestTemplate;
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod hook;
pub mod jobs_manager;
pub mod kubernetes_objects;
pub mod owner;
pub mod worker;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigLoadError),

    #[error("Failed to load job manifest.\n{0}")]
    TemplateError(#[from] owner::TemplateLoadError),

    #[error("Job management stopped due to following error:\n{0}")]
    JobsManagerError(#[from] jobs_manager::JobsManagerError),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            AppError::JobsManagerError(e) => e.span_trace(),
            _ => None,
        }
    }
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = config::Config::new_from_file(&cli.config).await?;
    if let Some(environment) = cli.environment {
        config = config.with_environment(environment);
    }

    info!("Config Loaded.");

    let manager = JobsManager::from_config(Arc::new(config));

    match cli.command {
        Command::Enqueue {
            manifest,
            max_workers,
        } => {
            let owner = ManifestTemplate::from_file(&manifest)
                .await?
                .with_max_workers(max_workers);
            let hook = EnqueueHook::new(manager);
            match hook.on_before_enqueue(&owner).await? {
                EnqueueOutcome::Skipped => info!("Job management is disabled; nothing done."),
                EnqueueOutcome::Applied(ApplyOutcome::Launched { name, namespace }) => {
                    info!("Worker job '{}/{}' launched.", namespace, name)
                }
                EnqueueOutcome::Applied(ApplyOutcome::AtCapacity {
                    group, running, ..
                }) => info!("Job group '{}' is full with {} workers.", group, running),
                EnqueueOutcome::Applied(ApplyOutcome::Disabled) => {
                    info!("No Kubernetes connection available; nothing done.")
                }
            }
        }
        Command::Reap {} => {
            let jobs = manager.reap_finished_jobs().await?;
            let pods = manager.reap_finished_pods().await?;
            info!("Reaped {} jobs and {} pods.", jobs, pods);
        }
    }

    Ok(())
}

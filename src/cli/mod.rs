use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Command,

    #[clap(
        short,
        long,
        default_value = "/etc/resque-kubernetes/config.yaml",
        global = true
    )]
    pub(crate) config: PathBuf,

    /// Current environment, checked against the configured environments
    #[clap(short, long, env = "RESQUE_KUBERNETES_ENV", global = true)]
    pub(crate) environment: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Reap finished jobs and pods, then launch a worker job if there is room
    Enqueue {
        /// Job manifest (YAML) used as the worker template
        #[clap(short, long)]
        manifest: PathBuf,

        /// Worker ceiling for this manifest, overriding the configured one
        #[clap(long)]
        max_workers: Option<u32>,
    },

    /// Reap finished jobs and pods
    Reap {},
}

use std::path::PathBuf;

use super::retry::{RetryConfig, TimeoutConfig};
use super::{Config, TerminationSignal};
use serde::Deserialize;
use thiserror::Error;

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConfig {
    #[serde(default = "default_enabled")]
    pub(super) enabled: bool,

    /// Environments in which jobs are managed
    #[serde(default = "default_environments")]
    pub(super) environments: Vec<String>,

    /// Name of the environment this process runs in
    #[serde(default)]
    pub(super) environment: Option<String>,

    #[serde(default = "default_max_workers")]
    pub(super) max_workers: u32,

    #[serde(default = "default_namespace")]
    pub(super) default_namespace: String,

    /// Kubeconfig used outside the cluster
    ///
    /// Example: "/home/deploy/.kube/config"
    #[serde(default)]
    pub(super) kubeconfig: Option<PathBuf>,

    /// Command printing a bearer token when the kubeconfig user has no credentials
    #[serde(default = "default_credentials_command")]
    pub(super) default_credentials_command: Vec<String>,

    #[serde(default = "default_reap_concurrency")]
    pub(super) reap_concurrency: usize,

    #[serde(default)]
    pub(super) termination_signal: TerminationSignal,

    #[serde(default)]
    pub(super) retry: RetryConfig,

    #[serde(default)]
    pub(super) timeouts: TimeoutConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            environments: default_environments(),
            environment: None,
            max_workers: default_max_workers(),
            default_namespace: default_namespace(),
            kubeconfig: None,
            default_credentials_command: default_credentials_command(),
            reap_concurrency: default_reap_concurrency(),
            termination_signal: TerminationSignal::default(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}
fn default_environments() -> Vec<String> {
    vec!["production".to_string()]
}
const fn default_max_workers() -> u32 {
    10
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_credentials_command() -> Vec<String> {
    ["gcloud", "auth", "application-default", "print-access-token"]
        .map(String::from)
        .to_vec()
}
const fn default_reap_concurrency() -> usize {
    4
}

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("reap_concurrency must be at least 1")]
    ReapConcurrencyZero,

    #[error("retry.max_attempts must be at least 1")]
    MaxAttemptsZero,

    #[error("termination_signal.name must not be empty")]
    EmptySignalName,

    #[error("default_namespace must not be empty")]
    EmptyDefaultNamespace,
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigParseError;
    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        if raw.reap_concurrency == 0 {
            return Err(ConfigParseError::ReapConcurrencyZero);
        }
        if raw.retry.max_attempts == 0 {
            return Err(ConfigParseError::MaxAttemptsZero);
        }
        if raw.termination_signal.name.trim().is_empty() {
            return Err(ConfigParseError::EmptySignalName);
        }
        if raw.default_namespace.trim().is_empty() {
            return Err(ConfigParseError::EmptyDefaultNamespace);
        }

        Ok(Config::from_raw(raw))
    }
}

impl Config {
    pub(super) fn from_raw(raw: RawConfig) -> Config {
        Config {
            enabled: raw.enabled,
            environments: raw.environments,
            environment: raw.environment,
            max_workers: raw.max_workers,
            default_namespace: raw.default_namespace,
            kubeconfig: raw.kubeconfig,
            default_credentials_command: raw.default_credentials_command,
            reap_concurrency: raw.reap_concurrency,
            termination_signal: raw.termination_signal,
            retry: raw.retry,
            timeouts: raw.timeouts,
            client_override: None,
        }
    }
}

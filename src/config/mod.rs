mod raw;
pub mod retry;

use std::path::{Path, PathBuf};

use derive_debug::Dbg;
use serde::Deserialize;
use thiserror::Error;

use self::raw::RawConfig;
pub use self::raw::ConfigParseError;
pub use self::retry::{RetryConfig, TimeoutConfig};

/// Process-wide settings, built once at startup and shared by reference.
#[derive(Dbg, Clone)]
pub struct Config {
    pub enabled: bool,
    pub environments: Vec<String>,
    pub environment: Option<String>,

    /// Ceiling used when an owner does not provide its own
    pub max_workers: u32,

    /// Namespace for manifests without one, unless the connection provides one
    pub default_namespace: String,

    pub kubeconfig: Option<PathBuf>,
    pub default_credentials_command: Vec<String>,
    pub reap_concurrency: usize,
    pub termination_signal: TerminationSignal,
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,

    /// Pre-built client used instead of resolving a connection context
    #[dbg(skip)]
    pub client_override: Option<kube::Client>,
}

/// Environment variable telling a worker to stop once its queues are empty.
///
/// Either field may be omitted in the config file and keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminationSignal {
    pub name: String,
    pub value: String,
}

impl Default for TerminationSignal {
    fn default() -> Self {
        Self {
            name: "INTERVAL".to_string(),
            value: "0".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigParseError),
}

impl Config {
    pub async fn new_from_file(path: &Path) -> Result<Config, ConfigLoadError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Config, ConfigLoadError> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        Ok(Config::try_from(raw)?)
    }

    pub fn with_client(mut self, client: kube::Client) -> Self {
        self.client_override = Some(client);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Jobs are managed when enabled and the current environment, if known,
    /// is one of the configured environments.
    pub fn is_enabled(&self) -> bool {
        self.enabled
            && self
                .environment
                .as_ref()
                .is_none_or(|env| self.environments.contains(env))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_raw(RawConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_without_environment() {
        assert!(Config::default().is_enabled());
    }

    #[test]
    fn test_enabled_only_in_listed_environments() {
        let config = Config::default().with_environment("test");
        assert!(!config.is_enabled());

        let config = Config {
            environments: vec!["test".to_string()],
            ..Config::default()
        }
        .with_environment("test");
        assert!(config.is_enabled());
    }

    #[test]
    fn test_disabled_flag_wins() {
        let config = Config {
            enabled: false,
            ..Config::default()
        };
        assert!(!config.is_enabled());
    }

    #[tokio::test]
    async fn test_new_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "max_workers: 2\nenvironment: production\n")
            .await
            .unwrap();

        let config = Config::new_from_file(&path).await.unwrap();

        assert_eq!(config.max_workers, 2);
        assert!(config.is_enabled());
        assert!(config.client_override.is_none());
    }

    #[tokio::test]
    async fn test_new_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::new_from_file(&dir.path().join("missing.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }));
    }
}

//! Selection of the connection used to reach the cluster.
//!
//! Providers are tried in a fixed order: the service account mounted into a
//! pod first, then the developer's kubeconfig. The first applicable provider
//! wins.

pub mod credentials;
pub mod kubeconfig;
pub mod well_known;

use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info, instrument};

use self::credentials::DefaultCredentials;
use self::kubeconfig::KubeconfigContext;
use self::well_known::WellKnownContext;
use crate::config::{Config, TimeoutConfig};

const CONTEXT_NAME: &str = "resque-kubernetes";

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    #[error("Kubeconfig has no usable current context")]
    NoCurrentContext,

    #[error("Kubeconfig context '{context}' refers to unknown cluster '{cluster}'")]
    UnknownCluster { context: String, cluster: String },

    #[error("Kubeconfig cluster '{0}' has no server")]
    MissingServer(String),

    #[error("Failed to build in-memory kubeconfig: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to build Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// TLS settings for reaching the API server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    pub ca_file: Option<String>,
    /// Base64 encoded PEM bundle
    pub ca_data: Option<String>,
    pub insecure_skip_verify: bool,
}

/// Where and how to connect. Never modified once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionContext {
    pub endpoint: String,
    pub api_version: String,
    pub namespace: Option<String>,
    /// Kubeconfig `user` entry, e.g. `{"tokenFile": "..."}`
    pub auth_options: Map<String, Value>,
    pub tls_options: TlsOptions,
}

impl ConnectionContext {
    fn to_kubeconfig(&self) -> Result<Kubeconfig, ContextError> {
        let mut cluster = Map::new();
        cluster.insert("server".to_string(), json!(self.endpoint));
        if let Some(ca_file) = &self.tls_options.ca_file {
            cluster.insert("certificate-authority".to_string(), json!(ca_file));
        }
        if let Some(ca_data) = &self.tls_options.ca_data {
            cluster.insert("certificate-authority-data".to_string(), json!(ca_data));
        }
        if self.tls_options.insecure_skip_verify {
            cluster.insert("insecure-skip-tls-verify".to_string(), json!(true));
        }

        let mut context = Map::new();
        context.insert("cluster".to_string(), json!(CONTEXT_NAME));
        context.insert("user".to_string(), json!(CONTEXT_NAME));
        if let Some(namespace) = &self.namespace {
            context.insert("namespace".to_string(), json!(namespace));
        }

        Ok(serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Config",
            "clusters": [{"name": CONTEXT_NAME, "cluster": cluster}],
            "users": [{"name": CONTEXT_NAME, "user": self.auth_options}],
            "contexts": [{"name": CONTEXT_NAME, "context": context}],
            "current-context": CONTEXT_NAME,
        }))?)
    }

    /// Client configuration for this context with the given transport timeouts.
    pub async fn to_config(&self, timeouts: &TimeoutConfig) -> Result<kube::Config, ContextError> {
        let kubeconfig = self.to_kubeconfig()?;
        let mut config =
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await?;
        config.connect_timeout = Some(timeouts.connect);
        config.read_timeout = Some(timeouts.read);
        Ok(config)
    }

    pub async fn to_client(&self, timeouts: &TimeoutConfig) -> Result<kube::Client, ContextError> {
        Ok(kube::Client::try_from(self.to_config(timeouts).await?)?)
    }
}

#[derive(Debug, Clone)]
pub enum ContextProvider {
    WellKnown(WellKnownContext),
    Kubeconfig(KubeconfigContext),
}

impl ContextProvider {
    pub fn applicable(&self) -> bool {
        match self {
            ContextProvider::WellKnown(p) => p.applicable(),
            ContextProvider::Kubeconfig(p) => p.applicable(),
        }
    }

    pub async fn build_context(&self) -> Result<ConnectionContext, ContextError> {
        match self {
            ContextProvider::WellKnown(p) => p.build_context().await,
            ContextProvider::Kubeconfig(p) => p.build_context().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ContextProvider::WellKnown(_) => "well-known",
            ContextProvider::Kubeconfig(_) => "kubeconfig",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextResolver {
    providers: Vec<ContextProvider>,
}

impl ContextResolver {
    pub fn new(providers: Vec<ContextProvider>) -> Self {
        ContextResolver { providers }
    }

    pub fn from_config(config: &Config) -> Self {
        let kubeconfig = match &config.kubeconfig {
            Some(path) => KubeconfigContext::new(path.clone()),
            None => KubeconfigContext::default(),
        }
        .with_default_credentials(DefaultCredentials::new(
            config.default_credentials_command.clone(),
        ));
        ContextResolver::new(vec![
            ContextProvider::WellKnown(WellKnownContext::default()),
            ContextProvider::Kubeconfig(kubeconfig),
        ])
    }

    /// Context of the first applicable provider, if any.
    #[instrument("context/resolve", level = "trace", skip(self))]
    pub async fn resolve(&self) -> Result<Option<ConnectionContext>, ContextError> {
        for provider in &self.providers {
            if !provider.applicable() {
                debug!("Connection context '{}' is not applicable.", provider.name());
                continue;
            }
            let context = provider.build_context().await?;
            info!(
                "Using '{}' connection context for {}.",
                provider.name(),
                context.endpoint
            );
            return Ok(Some(context));
        }
        Ok(None)
    }
}

impl Default for ContextResolver {
    fn default() -> Self {
        ContextResolver::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;

    fn well_known_in(dir: &Path) -> WellKnownContext {
        WellKnownContext::with_paths(
            dir.join("token"),
            dir.join("ca.crt"),
            dir.join("namespace"),
        )
    }

    #[tokio::test]
    async fn test_resolve_prefers_well_known() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token"), "secret").unwrap();
        std::fs::write(dir.path().join("config"), "apiVersion: v1\nkind: Config\n").unwrap();

        let resolver = ContextResolver::new(vec![
            ContextProvider::WellKnown(well_known_in(dir.path())),
            ContextProvider::Kubeconfig(KubeconfigContext::new(dir.path().join("config"))),
        ]);

        let context = resolver.resolve().await.unwrap().unwrap();
        assert_eq!(context.endpoint, "https://kubernetes.default.svc");
    }

    #[tokio::test]
    async fn test_resolve_none_when_nothing_applies() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ContextResolver::new(vec![
            ContextProvider::WellKnown(well_known_in(dir.path())),
            ContextProvider::Kubeconfig(KubeconfigContext::new(dir.path().join("config"))),
        ]);

        assert_eq!(resolver.resolve().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_to_config_applies_timeouts() {
        let context = ConnectionContext {
            endpoint: "https://127.0.0.1:8443".to_string(),
            api_version: "v1".to_string(),
            namespace: Some("jobs".to_string()),
            auth_options: json!({"token": "secret"}).as_object().unwrap().clone(),
            tls_options: TlsOptions::default(),
        };
        let timeouts = TimeoutConfig {
            connect: Duration::from_secs(3),
            read: Duration::from_secs(45),
        };

        let config = context.to_config(&timeouts).await.unwrap();

        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.default_namespace, "jobs");
    }

    #[test]
    fn test_to_kubeconfig_carries_context() {
        let context = ConnectionContext {
            endpoint: "https://127.0.0.1:8443".to_string(),
            api_version: "v1".to_string(),
            namespace: Some("jobs".to_string()),
            auth_options: json!({"tokenFile": "/tmp/token"})
                .as_object()
                .unwrap()
                .clone(),
            tls_options: TlsOptions {
                ca_file: Some("/tmp/ca.crt".to_string()),
                ..TlsOptions::default()
            },
        };

        let kubeconfig = context.to_kubeconfig().unwrap();

        assert_eq!(kubeconfig.current_context.as_deref(), Some(CONTEXT_NAME));
        let cluster = kubeconfig.clusters[0].cluster.as_ref().unwrap();
        assert_eq!(cluster.server.as_deref(), Some("https://127.0.0.1:8443"));
        assert_eq!(cluster.certificate_authority.as_deref(), Some("/tmp/ca.crt"));
        let auth = kubeconfig.auth_infos[0].auth_info.as_ref().unwrap();
        assert_eq!(auth.token_file.as_deref(), Some("/tmp/token"));
        let ctx = kubeconfig.contexts[0].context.as_ref().unwrap();
        assert_eq!(ctx.namespace.as_deref(), Some("jobs"));
    }
}

use std::path::PathBuf;

use serde_json::{Map, json};

use super::{ConnectionContext, ContextError, TlsOptions};

pub const TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
pub const NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

pub const IN_CLUSTER_ENDPOINT: &str = "https://kubernetes.default.svc";
pub const API_VERSION: &str = "v1";

/// Service account credentials mounted into every pod.
#[derive(Debug, Clone)]
pub struct WellKnownContext {
    token_file: PathBuf,
    ca_file: PathBuf,
    namespace_file: PathBuf,
}

impl WellKnownContext {
    pub fn with_paths(token_file: PathBuf, ca_file: PathBuf, namespace_file: PathBuf) -> Self {
        WellKnownContext {
            token_file,
            ca_file,
            namespace_file,
        }
    }

    pub fn applicable(&self) -> bool {
        self.token_file.exists()
    }

    pub async fn build_context(&self) -> Result<ConnectionContext, ContextError> {
        let mut auth_options = Map::new();
        auth_options.insert(
            "tokenFile".to_string(),
            json!(self.token_file.to_string_lossy()),
        );

        let tls_options = TlsOptions {
            ca_file: self
                .ca_file
                .exists()
                .then(|| self.ca_file.to_string_lossy().into_owned()),
            ..TlsOptions::default()
        };

        Ok(ConnectionContext {
            endpoint: IN_CLUSTER_ENDPOINT.to_string(),
            api_version: API_VERSION.to_string(),
            namespace: self.namespace().await?,
            auth_options,
            tls_options,
        })
    }

    async fn namespace(&self) -> Result<Option<String>, ContextError> {
        if !self.namespace_file.exists() {
            return Ok(None);
        }
        let namespace = tokio::fs::read_to_string(&self.namespace_file)
            .await
            .map_err(|source| ContextError::Io {
                path: self.namespace_file.display().to_string(),
                source,
            })?;
        let namespace = namespace.trim();
        Ok((!namespace.is_empty()).then(|| namespace.to_string()))
    }
}

impl Default for WellKnownContext {
    fn default() -> Self {
        WellKnownContext::with_paths(TOKEN_FILE.into(), CA_FILE.into(), NAMESPACE_FILE.into())
    }
}

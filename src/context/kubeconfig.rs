use std::path::PathBuf;

use kube::config::{AuthInfo, Kubeconfig};
use serde_json::{Map, Value, json};
use tracing::info;

use super::credentials::DefaultCredentials;
use super::well_known::API_VERSION;
use super::{ConnectionContext, ContextError, TlsOptions};

/// The current context of a developer's kubeconfig file.
#[derive(Debug, Clone)]
pub struct KubeconfigContext {
    path: PathBuf,
    default_credentials: DefaultCredentials,
}

impl KubeconfigContext {
    pub fn new(path: PathBuf) -> Self {
        KubeconfigContext {
            path,
            default_credentials: DefaultCredentials::default(),
        }
    }

    pub fn with_default_credentials(mut self, credentials: DefaultCredentials) -> Self {
        self.default_credentials = credentials;
        self
    }

    pub fn applicable(&self) -> bool {
        self.path.is_file()
    }

    pub async fn build_context(&self) -> Result<ConnectionContext, ContextError> {
        let kubeconfig = Kubeconfig::read_from(&self.path)?;

        let context_name = kubeconfig
            .current_context
            .as_deref()
            .ok_or(ContextError::NoCurrentContext)?;
        let context = kubeconfig
            .contexts
            .iter()
            .find(|named| named.name == context_name)
            .and_then(|named| named.context.as_ref())
            .ok_or(ContextError::NoCurrentContext)?;
        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|named| named.name == context.cluster)
            .and_then(|named| named.cluster.as_ref())
            .ok_or_else(|| ContextError::UnknownCluster {
                context: context_name.to_string(),
                cluster: context.cluster.clone(),
            })?;
        let endpoint = cluster
            .server
            .clone()
            .ok_or_else(|| ContextError::MissingServer(context.cluster.clone()))?;

        let auth_info = context.user.as_ref().and_then(|user| {
            kubeconfig
                .auth_infos
                .iter()
                .find(|named| &named.name == user)
                .and_then(|named| named.auth_info.as_ref())
        });
        let mut auth_options = match auth_info {
            Some(auth_info) => auth_options(auth_info)?,
            None => Map::new(),
        };
        if auth_options.is_empty()
            && let Some(token) = self.default_credentials.bearer_token().await
        {
            info!("Kubeconfig user has no credentials; using default credentials.");
            auth_options.insert("token".to_string(), json!(token));
        }

        Ok(ConnectionContext {
            endpoint,
            api_version: API_VERSION.to_string(),
            namespace: context.namespace.clone(),
            auth_options,
            tls_options: TlsOptions {
                ca_file: cluster.certificate_authority.clone(),
                ca_data: cluster.certificate_authority_data.clone(),
                insecure_skip_verify: cluster.insecure_skip_tls_verify.unwrap_or(false),
            },
        })
    }
}

impl Default for KubeconfigContext {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        KubeconfigContext::new(home.join(".kube").join("config"))
    }
}

/// The user entry as a kubeconfig mapping, without unset fields.
fn auth_options(auth_info: &AuthInfo) -> Result<Map<String, Value>, ContextError> {
    let Value::Object(mut map) = serde_json::to_value(auth_info)? else {
        return Ok(Map::new());
    };
    map.retain(|_, value| !value.is_null());
    Ok(map)
}

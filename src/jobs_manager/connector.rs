use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::client::{ClusterClient, KubeClusterClient};
use crate::config::Config;
use crate::context::{ContextError, ContextResolver};

/// A client together with the namespace its context defaults to.
pub struct Connection<C> {
    pub client: C,
    pub namespace: Option<String>,
}

/// Produces the client the jobs manager talks to.
///
/// `Ok(None)` means no connection is available, which disables the manager
/// for that call.
pub trait Connector: Send + Sync {
    type Client: ClusterClient;

    fn connect(
        &self,
    ) -> impl Future<Output = Result<Option<Connection<Self::Client>>, ContextError>> + Send;
}

/// Connects with the configured client override, or else with the first
/// applicable connection context.
///
/// An overriding client brings its own default namespace.
#[derive(Debug, Clone)]
pub struct KubeConnector {
    config: Arc<Config>,
    resolver: ContextResolver,
}

impl KubeConnector {
    pub fn new(config: Arc<Config>) -> Self {
        let resolver = ContextResolver::from_config(&config);
        KubeConnector { config, resolver }
    }

    pub fn with_resolver(config: Arc<Config>, resolver: ContextResolver) -> Self {
        KubeConnector { config, resolver }
    }
}

impl Connector for KubeConnector {
    type Client = KubeClusterClient;

    #[instrument("kube_connector/connect", level = "trace", skip(self))]
    async fn connect(&self) -> Result<Option<Connection<KubeClusterClient>>, ContextError> {
        if let Some(client) = &self.config.client_override {
            debug!("Using the configured Kubernetes client.");
            let client = KubeClusterClient::new(client.clone());
            let namespace = Some(client.default_namespace().to_string());
            return Ok(Some(Connection { client, namespace }));
        }

        let Some(context) = self.resolver.resolve().await? else {
            return Ok(None);
        };
        let client = context.to_client(&self.config.timeouts).await?;
        Ok(Some(Connection {
            client: KubeClusterClient::new(client),
            namespace: context.namespace,
        }))
    }
}

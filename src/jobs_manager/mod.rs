pub mod apply;
pub mod connector;
pub mod error;
mod reap;

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::client::{RetryingClient, TimeoutRetry};
use crate::config::Config;
use crate::error::SpannedErr;

pub use self::apply::ApplyOutcome;
pub use self::connector::{Connection, Connector, KubeConnector};
pub use self::error::JobsManagerError;

struct Connected<C> {
    client: RetryingClient<C>,
    default_namespace: String,
}

/// Launches and reaps the Kubernetes Jobs that run queue workers.
///
/// The connection is established on first use and kept for the lifetime of
/// the manager. Cluster state itself is never cached: every call lists what
/// it needs again.
pub struct JobsManager<K: Connector> {
    config: Arc<Config>,
    connector: K,
    connected: OnceCell<Connected<K::Client>>,
}

impl JobsManager<KubeConnector> {
    pub fn from_config(config: Arc<Config>) -> Self {
        let connector = KubeConnector::new(config.clone());
        JobsManager::new(config, connector)
    }
}

impl<K: Connector> JobsManager<K> {
    pub fn new(config: Arc<Config>, connector: K) -> Self {
        JobsManager {
            config,
            connector,
            connected: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn connected(&self) -> Result<Option<&Connected<K::Client>>, JobsManagerError> {
        let result = self
            .connected
            .get_or_try_init(|| async {
                match self.connector.connect().await {
                    Ok(Some(connection)) => {
                        let default_namespace = connection
                            .namespace
                            .unwrap_or_else(|| self.config.default_namespace.clone());
                        info!(
                            "Connected to Kubernetes (default namespace '{}').",
                            default_namespace
                        );
                        Ok(Connected {
                            client: RetryingClient::new(
                                connection.client,
                                TimeoutRetry::new(self.config.retry.clone()),
                            ),
                            default_namespace,
                        })
                    }
                    Ok(None) => Err(None),
                    Err(e) => Err(Some(e)),
                }
            })
            .await;

        match result {
            Ok(connected) => Ok(Some(connected)),
            Err(None) => {
                warn!("No Kubernetes connection context applies; jobs are not managed.");
                Ok(None)
            }
            Err(Some(e)) => Err(SpannedErr::capture(e).into()),
        }
    }
}

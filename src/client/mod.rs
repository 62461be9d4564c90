pub mod kube_client;
pub mod retrying;

#[cfg(test)]
pub(crate) mod fake;

use std::error::Error as StdError;
use std::future::Future;

use thiserror::Error;

use crate::kubernetes_objects::job::RunningUnit;
use crate::kubernetes_objects::manifest::Manifest;
use crate::kubernetes_objects::pod::PodSnapshot;

pub use self::kube_client::KubeClusterClient;
pub use self::retrying::{RetryPolicy, RetryingClient, TimeoutRetry};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Kubernetes API responded {code} {reason}: {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("Kubernetes transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync + 'static>),

    #[error("Manifest is not a valid Job: {0}")]
    InvalidManifest(#[source] serde_json::Error),
}

impl ClusterError {
    pub fn transport(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        ClusterError::Transport(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::Api { code: 404, .. })
    }

    /// Transport failures whose message chain reports a timeout.
    pub fn is_timeout(&self) -> bool {
        let ClusterError::Transport(err) = self else {
            return false;
        };
        let first: &(dyn StdError + 'static) = &**err;
        let mut current = Some(first);
        while let Some(err) = current {
            if err.to_string().to_lowercase().contains("timed out") {
                return true;
            }
            current = err.source();
        }
        false
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => ClusterError::Api {
                code: ae.code,
                reason: ae.reason.clone(),
                message: ae.message.clone(),
            },
            other => ClusterError::Transport(Box::new(other)),
        }
    }
}

/// The cluster calls the jobs manager depends on.
///
/// `namespace: None` lists across all namespaces.
pub trait ClusterClient: Send + Sync {
    fn list_jobs(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<Vec<RunningUnit>, ClusterError>> + Send;

    fn delete_job(
        &self,
        name: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;

    fn create_job(
        &self,
        manifest: &Manifest,
    ) -> impl Future<Output = Result<RunningUnit, ClusterError>> + Send;

    fn list_pods(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<Vec<PodSnapshot>, ClusterError>> + Send;

    fn delete_pod(
        &self,
        name: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<(), ClusterError>> + Send;
}

use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

use crate::client::ClusterError;
use crate::context::ContextError;
use crate::error::SpannedErr;
use crate::kubernetes_objects::manifest::ManifestError;

#[derive(Error, Debug)]
pub enum JobsManagerError {
    #[error("Failed to connect to Kubernetes: {0}")]
    Connect(#[from] SpannedErr<ContextError>),

    #[error("Kubernetes client error: {0}")]
    KubeClient(#[from] SpannedErr<ClusterError>),

    #[error("Job manifest error: {0}")]
    Manifest(#[from] SpannedErr<ManifestError>),
}

impl JobsManagerError {
    pub fn cluster_error(&self) -> Option<&ClusterError> {
        match self {
            JobsManagerError::KubeClient(e) => Some(&e.err),
            _ => None,
        }
    }
}

impl ExtractSpanTrace for JobsManagerError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            JobsManagerError::Connect(e) => e.span_trace(),
            JobsManagerError::KubeClient(e) => e.span_trace(),
            JobsManagerError::Manifest(e) => e.span_trace(),
        }
    }
}

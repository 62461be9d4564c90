use k8s_openapi::api::core::v1::Pod;

pub const SUCCEEDED_PHASE: &str = "Succeeded";
pub const COMPLETED_REASON: &str = "Completed";

/// Snapshot of a pod started by a managed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    pub name: String,
    pub namespace: String,
    pub phase: Option<String>,
    /// Terminated reason of each container status, `None` while not terminated
    pub container_reasons: Vec<Option<String>>,
}

impl PodSnapshot {
    /// A pod can be removed once it succeeded and every container completed.
    pub fn is_reapable(&self) -> bool {
        self.phase.as_deref() == Some(SUCCEEDED_PHASE)
            && self
                .container_reasons
                .iter()
                .all(|reason| reason.as_deref() == Some(COMPLETED_REASON))
    }
}

impl From<&Pod> for PodSnapshot {
    fn from(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        PodSnapshot {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            phase: status.and_then(|s| s.phase.clone()),
            container_reasons: status
                .and_then(|s| s.container_statuses.as_ref())
                .map(|statuses| {
                    statuses
                        .iter()
                        .map(|cs| {
                            cs.state
                                .as_ref()
                                .and_then(|state| state.terminated.as_ref())
                                .and_then(|terminated| terminated.reason.clone())
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

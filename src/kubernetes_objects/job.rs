use k8s_openapi::api::batch::v1::Job;

/// Snapshot of a launched job, as listed from the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningUnit {
    pub name: String,
    pub namespace: String,
    pub desired_completions: i32,
    pub succeeded: i32,
}

impl RunningUnit {
    pub fn is_finished(&self) -> bool {
        self.succeeded == self.desired_completions
    }

    pub fn is_running(&self) -> bool {
        !self.is_finished()
    }
}

impl From<&Job> for RunningUnit {
    fn from(job: &Job) -> Self {
        RunningUnit {
            name: job.metadata.name.clone().unwrap_or_default(),
            namespace: job.metadata.namespace.clone().unwrap_or_default(),
            // the API server defaults completions to 1
            desired_completions: job.spec.as_ref().and_then(|s| s.completions).unwrap_or(1),
            succeeded: job.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0),
        }
    }
}

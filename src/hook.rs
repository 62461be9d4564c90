use tracing::{debug, instrument};

use crate::jobs_manager::{ApplyOutcome, Connector, JobsManager, JobsManagerError};
use crate::owner::JobOwner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Job management is off for the current environment.
    Skipped,
    Applied(ApplyOutcome),
}

/// Runs before a job is enqueued: clears out finished jobs and pods, then
/// makes sure a worker exists to pick the job up.
pub struct EnqueueHook<K: Connector> {
    manager: JobsManager<K>,
}

impl<K: Connector> EnqueueHook<K> {
    pub fn new(manager: JobsManager<K>) -> Self {
        EnqueueHook { manager }
    }

    pub fn manager(&self) -> &JobsManager<K> {
        &self.manager
    }

    #[instrument("before_enqueue", skip_all)]
    pub async fn on_before_enqueue<O: JobOwner + ?Sized>(
        &self,
        owner: &O,
    ) -> Result<EnqueueOutcome, JobsManagerError> {
        if !self.manager.config().is_enabled() {
            debug!("Job management is disabled for this environment.");
            return Ok(EnqueueOutcome::Skipped);
        }

        self.manager.reap_finished_jobs().await?;
        self.manager.reap_finished_pods().await?;
        let outcome = self.manager.apply_job(owner).await?;
        Ok(EnqueueOutcome::Applied(outcome))
    }
}

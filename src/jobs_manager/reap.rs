use futures::StreamExt;
use futures::stream;
use tracing::{Instrument, debug, error, info, instrument};

use super::{Connector, JobsManager, JobsManagerError};
use crate::client::{ClusterClient, ClusterError};
use crate::error::{SpannedErr, SpannedExt};
use crate::kubernetes_objects::job::RunningUnit;
use crate::kubernetes_objects::pod::PodSnapshot;
use crate::kubernetes_objects::{job_selector, pod_selector};

struct Deletion {
    name: String,
    namespace: String,
    result: Result<(), SpannedErr<ClusterError>>,
}

impl<K: Connector> JobsManager<K> {
    /// Deletes every managed job whose pods all succeeded.
    ///
    /// Returns the number of jobs deleted.
    #[instrument("reap_finished_jobs", skip(self))]
    pub async fn reap_finished_jobs(&self) -> Result<usize, JobsManagerError> {
        let Some(connected) = self.connected().await? else {
            return Ok(0);
        };
        let client = &connected.client;

        let finished: Vec<RunningUnit> = client
            .list_jobs(&job_selector(), None)
            .await
            .with_span_trace()?
            .into_iter()
            .filter(RunningUnit::is_finished)
            .collect();

        let deletions = stream::iter(finished)
            .map(|unit| {
                async move {
                    let result = client
                        .delete_job(&unit.name, &unit.namespace)
                        .await
                        .with_span_trace();
                    Deletion {
                        name: unit.name,
                        namespace: unit.namespace,
                        result,
                    }
                }
                .in_current_span()
            })
            .buffer_unordered(self.config.reap_concurrency)
            .collect::<Vec<_>>()
            .await;

        settle("job", deletions)
    }

    /// Deletes every managed pod that succeeded with all containers completed.
    ///
    /// Returns the number of pods deleted.
    #[instrument("reap_finished_pods", skip(self))]
    pub async fn reap_finished_pods(&self) -> Result<usize, JobsManagerError> {
        let Some(connected) = self.connected().await? else {
            return Ok(0);
        };
        let client = &connected.client;

        let finished: Vec<PodSnapshot> = client
            .list_pods(&pod_selector(), None)
            .await
            .with_span_trace()?
            .into_iter()
            .filter(PodSnapshot::is_reapable)
            .collect();

        let deletions = stream::iter(finished)
            .map(|pod| {
                async move {
                    let result = client
                        .delete_pod(&pod.name, &pod.namespace)
                        .await
                        .with_span_trace();
                    Deletion {
                        name: pod.name,
                        namespace: pod.namespace,
                        result,
                    }
                }
                .in_current_span()
            })
            .buffer_unordered(self.config.reap_concurrency)
            .collect::<Vec<_>>()
            .await;

        settle("pod", deletions)
    }
}

/// Counts successful deletions. Objects already gone are skipped; any other
/// failure is returned once every deletion has been attempted.
fn settle(kind: &str, deletions: Vec<Deletion>) -> Result<usize, JobsManagerError> {
    let mut deleted = 0;
    let mut first_error = None;

    for Deletion {
        name,
        namespace,
        result,
    } in deletions
    {
        match result {
            Ok(()) => {
                info!("Deleted finished {} '{}/{}'.", kind, namespace, name);
                deleted += 1;
            }
            Err(e) if e.err.is_not_found() => {
                debug!("Finished {} '{}/{}' was already deleted.", kind, namespace, name);
            }
            Err(e) => {
                error!("Failed to delete finished {} '{}/{}': {}", kind, namespace, name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(deleted),
    }
}

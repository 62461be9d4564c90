use tracing::{Span, info, instrument};

use super::{Connector, JobsManager, JobsManagerError};
use crate::client::ClusterClient;
use crate::error::SpannedExt;
use crate::kubernetes_objects::conformance::{adjust_manifest, ensure_namespace};
use crate::kubernetes_objects::group_selector;
use crate::kubernetes_objects::manifest::ManifestError;
use crate::owner::JobOwner;

/// What a launch attempt ended with. Only failures are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Launched {
        name: String,
        namespace: String,
    },
    /// The group already has `running` unfinished jobs, at or above the ceiling.
    AtCapacity {
        group: String,
        running: usize,
        max_workers: u32,
    },
    /// No connection context applies to this process.
    Disabled,
}

impl<K: Connector> JobsManager<K> {
    /// Launches one more worker job for `owner` unless its group is full.
    #[instrument(
        "apply_job",
        skip_all,
        fields(kubernetes_namespace, job_name)
    )]
    pub async fn apply_job<O: JobOwner + ?Sized>(
        &self,
        owner: &O,
    ) -> Result<ApplyOutcome, JobsManagerError> {
        let Some(connected) = self.connected().await? else {
            return Ok(ApplyOutcome::Disabled);
        };

        let mut manifest = owner.job_manifest();
        ensure_namespace(&mut manifest, &connected.default_namespace).with_span_trace()?;

        let group = manifest
            .name()
            .ok_or(ManifestError::MissingName)
            .with_span_trace()?
            .to_string();
        let namespace = manifest
            .namespace()
            .unwrap_or(&connected.default_namespace)
            .to_string();
        Span::current()
            .record("kubernetes_namespace", namespace.as_str())
            .record("job_name", group.as_str());

        let max_workers = owner.max_workers().unwrap_or(self.config.max_workers);
        let running = connected
            .client
            .list_jobs(&group_selector(&group), Some(&namespace))
            .await
            .with_span_trace()?
            .iter()
            .filter(|unit| unit.is_running())
            .count();

        // The ceiling is soft: concurrent callers may each see room for one more.
        if running >= max_workers as usize {
            info!(
                "Job group '{}/{}' has {} running workers (max {}); not launching.",
                namespace, group, running, max_workers
            );
            return Ok(ApplyOutcome::AtCapacity {
                group,
                running,
                max_workers,
            });
        }

        adjust_manifest(&mut manifest, &self.config.termination_signal).with_span_trace()?;
        let created = connected
            .client
            .create_job(&manifest)
            .await
            .with_span_trace()?;

        info!(
            "Launched job '{}/{}' ({} of {} workers).",
            created.namespace,
            created.name,
            running + 1,
            max_workers
        );
        Ok(ApplyOutcome::Launched {
            name: created.name,
            namespace: created.namespace,
        })
    }
}

use derive_debug::Dbg;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource};
use tracing::{Level, instrument};

use super::{ClusterClient, ClusterError};
use crate::kubernetes_objects::MANAGER_ROLE_NAME;
use crate::kubernetes_objects::job::RunningUnit;
use crate::kubernetes_objects::manifest::Manifest;
use crate::kubernetes_objects::pod::PodSnapshot;

/// `ClusterClient` backed by the Kubernetes API.
#[derive(Dbg, Clone)]
pub struct KubeClusterClient {
    #[dbg(skip)]
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        KubeClusterClient { client }
    }

    pub fn default_namespace(&self) -> &str {
        self.client.default_namespace()
    }

    fn api<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

impl ClusterClient for KubeClusterClient {
    #[instrument("kube/list_jobs", level = Level::TRACE, skip(self))]
    async fn list_jobs(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<RunningUnit>, ClusterError> {
        let api: Api<Job> = self.api(namespace);
        let jobs = api
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(jobs.items.iter().map(RunningUnit::from).collect())
    }

    #[instrument("kube/delete_job", level = Level::TRACE, skip(self))]
    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        let api: Api<Job> = self.api(Some(namespace));
        api.delete(name, &DeleteParams::background()).await?;
        Ok(())
    }

    #[instrument(
        "kube/create_job",
        level = Level::TRACE,
        skip_all,
        fields(job_name = ?manifest.name(), kubernetes_namespace = ?manifest.namespace())
    )]
    async fn create_job(&self, manifest: &Manifest) -> Result<RunningUnit, ClusterError> {
        let job: Job = serde_json::from_value(manifest.clone().into_value())
            .map_err(ClusterError::InvalidManifest)?;
        let namespace = manifest
            .namespace()
            .unwrap_or_else(|| self.client.default_namespace());
        let api: Api<Job> = self.api(Some(namespace));

        let post_params = PostParams {
            field_manager: Some(MANAGER_ROLE_NAME.to_string()),
            ..Default::default()
        };
        let created = api.create(&post_params, &job).await?;
        Ok(RunningUnit::from(&created))
    }

    #[instrument("kube/list_pods", level = Level::TRACE, skip(self))]
    async fn list_pods(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<PodSnapshot>, ClusterError> {
        let api: Api<Pod> = self.api(namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(pods.items.iter().map(PodSnapshot::from).collect())
    }

    #[instrument("kube/delete_pod", level = Level::TRACE, skip(self))]
    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        let api: Api<Pod> = self.api(Some(namespace));
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{ClusterClient, ClusterError};
use crate::context::ContextError;
use crate::jobs_manager::{Connection, Connector};
use crate::kubernetes_objects::job::RunningUnit;
use crate::kubernetes_objects::manifest::Manifest;
use crate::kubernetes_objects::pod::PodSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Operation {
    ListJobs,
    DeleteJob,
    CreateJob,
    ListPods,
    DeletePod,
}

type Labels = BTreeMap<String, String>;

/// In-memory cluster recording every call made against it.
#[derive(Clone, Default)]
pub(crate) struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    jobs: Vec<(RunningUnit, Labels)>,
    pods: Vec<(PodSnapshot, Labels)>,
    created: Vec<Manifest>,
    deleted_jobs: Vec<String>,
    deleted_pods: Vec<String>,
    calls: Vec<(Operation, String)>,
    failures: HashMap<Operation, VecDeque<ClusterError>>,
    failures_by_name: HashMap<(Operation, String), ClusterError>,
}

pub(crate) fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn unit(name: &str, desired_completions: i32, succeeded: i32) -> RunningUnit {
    RunningUnit {
        name: name.to_string(),
        namespace: "default".to_string(),
        desired_completions,
        succeeded,
    }
}

pub(crate) fn not_found(name: &str) -> ClusterError {
    ClusterError::Api {
        code: 404,
        reason: "NotFound".to_string(),
        message: format!("\"{name}\" not found"),
    }
}

fn matches_selector(selector: &str, labels: &Labels) -> bool {
    selector
        .split(',')
        .filter_map(|term| term.split_once('='))
        .all(|(key, value)| labels.get(key).map(String::as_str) == Some(value))
}

impl FakeCluster {
    pub(crate) fn with_job(self, unit: RunningUnit, labels: Labels) -> Self {
        self.state.lock().unwrap().jobs.push((unit, labels));
        self
    }

    pub(crate) fn with_pod(self, pod: PodSnapshot, labels: Labels) -> Self {
        self.state.lock().unwrap().pods.push((pod, labels));
        self
    }

    /// Queues an error returned by the next call of `operation`.
    pub(crate) fn fail(&self, operation: Operation, err: ClusterError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    /// Fails every call of `operation` targeting `name`.
    pub(crate) fn fail_for(&self, operation: Operation, name: &str, err: ClusterError) {
        self.state
            .lock()
            .unwrap()
            .failures_by_name
            .insert((operation, name.to_string()), err);
    }

    pub(crate) fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    pub(crate) fn calls(&self) -> Vec<(Operation, String)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn created(&self) -> Vec<Manifest> {
        self.state.lock().unwrap().created.clone()
    }

    pub(crate) fn deleted_jobs(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_jobs.clone()
    }

    pub(crate) fn deleted_pods(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_pods.clone()
    }

    fn record(&self, operation: Operation, target: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((operation, target.to_string()));
        if let Some(err) = state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        match state.failures_by_name.get(&(operation, target.to_string())) {
            Some(ClusterError::Api {
                code,
                reason,
                message,
            }) => Err(ClusterError::Api {
                code: *code,
                reason: reason.clone(),
                message: message.clone(),
            }),
            Some(other) => Err(ClusterError::transport(other.to_string())),
            None => Ok(()),
        }
    }
}

impl ClusterClient for FakeCluster {
    async fn list_jobs(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<RunningUnit>, ClusterError> {
        self.record(Operation::ListJobs, label_selector)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .iter()
            .filter(|(unit, labels)| {
                matches_selector(label_selector, labels)
                    && namespace.is_none_or(|ns| unit.namespace == ns)
            })
            .map(|(unit, _)| unit.clone())
            .collect())
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        self.record(Operation::DeleteJob, name)?;
        let mut state = self.state.lock().unwrap();
        let before = state.jobs.len();
        state
            .jobs
            .retain(|(unit, _)| !(unit.name == name && unit.namespace == namespace));
        if state.jobs.len() == before {
            return Err(not_found(name));
        }
        state.deleted_jobs.push(name.to_string());
        Ok(())
    }

    async fn create_job(&self, manifest: &Manifest) -> Result<RunningUnit, ClusterError> {
        let name = manifest.name().unwrap_or_default().to_string();
        self.record(Operation::CreateJob, &name)?;
        let labels = manifest
            .get(&["metadata", "labels"])
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let created = RunningUnit {
            name,
            namespace: manifest.namespace().unwrap_or("default").to_string(),
            desired_completions: 1,
            succeeded: 0,
        };
        let mut state = self.state.lock().unwrap();
        state.created.push(manifest.clone());
        state.jobs.push((created.clone(), labels));
        Ok(created)
    }

    async fn list_pods(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<PodSnapshot>, ClusterError> {
        self.record(Operation::ListPods, label_selector)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .pods
            .iter()
            .filter(|(pod, labels)| {
                matches_selector(label_selector, labels)
                    && namespace.is_none_or(|ns| pod.namespace == ns)
            })
            .map(|(pod, _)| pod.clone())
            .collect())
    }

    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        self.record(Operation::DeletePod, name)?;
        let mut state = self.state.lock().unwrap();
        let before = state.pods.len();
        state
            .pods
            .retain(|(pod, _)| !(pod.name == name && pod.namespace == namespace));
        if state.pods.len() == before {
            return Err(not_found(name));
        }
        state.deleted_pods.push(name.to_string());
        Ok(())
    }
}

/// Hands out a [`FakeCluster`], or nothing when no cluster is set.
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    cluster: Option<FakeCluster>,
    namespace: Option<String>,
    connects: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub(crate) fn new(cluster: FakeCluster) -> Self {
        FakeConnector {
            cluster: Some(cluster),
            ..Default::default()
        }
    }

    pub(crate) fn unavailable() -> Self {
        FakeConnector::default()
    }

    pub(crate) fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Client = FakeCluster;

    async fn connect(&self) -> Result<Option<Connection<FakeCluster>>, ContextError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.cluster.clone().map(|client| Connection {
            client,
            namespace: self.namespace.clone(),
        }))
    }
}

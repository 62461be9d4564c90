use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::{ClusterClient, ClusterError};
use crate::config::RetryConfig;
use crate::kubernetes_objects::job::RunningUnit;
use crate::kubernetes_objects::manifest::Manifest;
use crate::kubernetes_objects::pod::PodSnapshot;

/// Decides whether a failed cluster call is attempted again.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next attempt, or `None` when `error` must be returned.
    ///
    /// `attempt` is the number of attempts made so far, starting at 1.
    fn retry_after(&self, error: &ClusterError, attempt: u32) -> Option<Duration>;
}

/// Retries timed out transport errors with exponential back-off.
#[derive(Debug, Clone)]
pub struct TimeoutRetry {
    config: RetryConfig,
}

impl TimeoutRetry {
    pub fn new(config: RetryConfig) -> Self {
        TimeoutRetry { config }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        if self.config.initial_backoff.is_zero() {
            return Duration::ZERO;
        }
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let delay = self
            .config
            .initial_backoff
            .saturating_mul(factor)
            .min(self.config.max_backoff);
        if !self.config.jitter {
            return delay;
        }
        let half = delay / 2;
        half + half.mul_f64(random_unit())
    }
}

impl Default for TimeoutRetry {
    fn default() -> Self {
        TimeoutRetry::new(RetryConfig::default())
    }
}

impl RetryPolicy for TimeoutRetry {
    fn retry_after(&self, error: &ClusterError, attempt: u32) -> Option<Duration> {
        (error.is_timeout() && attempt < self.config.max_attempts).then(|| self.backoff(attempt))
    }
}

/// Uniform value in `[0, 1]`; zero when the OS has no randomness to give.
fn random_unit() -> f64 {
    let mut bytes = [0u8; 8];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes) as f64 / u64::MAX as f64,
        Err(_) => 0.0,
    }
}

/// Forwards every call to the wrapped client, retrying the failures the
/// policy accepts. Results and errors are returned unchanged.
#[derive(Debug, Clone)]
pub struct RetryingClient<C, P = TimeoutRetry> {
    inner: C,
    policy: P,
}

impl<C, P> RetryingClient<C, P>
where
    P: RetryPolicy,
{
    pub fn new(inner: C, policy: P) -> Self {
        RetryingClient { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T, ClusterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClusterError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match f().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let Some(delay) = self.policy.retry_after(&err, attempt) else {
                return Err(err);
            };
            warn!(
                "Cluster call '{}' failed on attempt {}: {}",
                operation, attempt, err
            );
            warn!("Retrying in {} ms...", delay.as_millis());
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

impl<C, P> ClusterClient for RetryingClient<C, P>
where
    C: ClusterClient,
    P: RetryPolicy,
{
    async fn list_jobs(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<RunningUnit>, ClusterError> {
        self.call("list_jobs", || self.inner.list_jobs(label_selector, namespace))
            .await
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        self.call("delete_job", || self.inner.delete_job(name, namespace))
            .await
    }

    async fn create_job(&self, manifest: &Manifest) -> Result<RunningUnit, ClusterError> {
        self.call("create_job", || self.inner.create_job(manifest))
            .await
    }

    async fn list_pods(
        &self,
        label_selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<PodSnapshot>, ClusterError> {
        self.call("list_pods", || self.inner.list_pods(label_selector, namespace))
            .await
    }

    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        self.call("delete_pod", || self.inner.delete_pod(name, namespace))
            .await
    }
}

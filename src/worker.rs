use tracing::info;

use crate::config::TerminationSignal;

/// Lets a launched worker exit once there is nothing left to do.
///
/// Jobs are launched with the termination signal set in their environment;
/// a worker started any other way keeps polling forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermOnEmpty {
    enabled: bool,
}

impl TermOnEmpty {
    pub fn from_env(signal: &TerminationSignal) -> Self {
        Self::from_lookup(signal, |name| std::env::var(name).ok())
    }

    pub fn from_lookup(
        signal: &TerminationSignal,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Self {
        TermOnEmpty {
            enabled: lookup(&signal.name).as_deref() == Some(signal.value.as_str()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when the worker was launched to drain its queues and every queue
    /// is empty.
    pub fn should_terminate(&self, queue_sizes: &[usize]) -> bool {
        if !self.enabled || queue_sizes.iter().any(|size| *size > 0) {
            return false;
        }
        info!("shutdown: queues are empty");
        true
    }
}

use std::time::Duration;

use duration_string::DurationString;
use serde::{Deserialize, Deserializer};

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    DurationString::deserialize(deserializer).map(Duration::from)
}

/// Retry behaviour for cluster calls that time out.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct RetryConfig {
    /// Total attempts per call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Zero disables sleeping between attempts
    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_initial_backoff"
    )]
    pub initial_backoff: Duration,

    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_max_backoff"
    )]
    pub max_backoff: Duration,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl RetryConfig {
    /// Retries without sleeping in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: false,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            jitter: default_jitter(),
        }
    }
}

/// Per-call transport timeouts handed to the kube client.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct TimeoutConfig {
    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_connect_timeout"
    )]
    pub connect: Duration,

    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_read_timeout"
    )]
    pub read: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: default_connect_timeout(),
            read: default_read_timeout(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}
const fn default_initial_backoff() -> Duration {
    Duration::from_millis(200)
}
const fn default_max_backoff() -> Duration {
    Duration::from_secs(5)
}
const fn default_jitter() -> bool {
    true
}
const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}
const fn default_read_timeout() -> Duration {
    Duration::from_secs(30)
}

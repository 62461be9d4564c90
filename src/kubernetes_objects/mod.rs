pub mod conformance;
pub mod job;
pub mod manifest;
pub mod pod;
pub mod random;

pub(crate) const MANAGER_ROLE_NAME: &str = "resque-kubernetes";

/// Label carried by every job and pod launched by the manager.
pub const MANAGED_LABEL: &str = "resque-kubernetes";
/// Label grouping jobs launched from the same manifest.
pub const GROUP_LABEL: &str = "resque-kubernetes-group";

pub const JOB_LABEL_VALUE: &str = "job";
pub const POD_LABEL_VALUE: &str = "pod";

pub(crate) fn job_selector() -> String {
    format!("{MANAGED_LABEL}={JOB_LABEL_VALUE}")
}

pub(crate) fn group_selector(group: &str) -> String {
    format!("{MANAGED_LABEL}={JOB_LABEL_VALUE},{GROUP_LABEL}={group}")
}

pub(crate) fn pod_selector() -> String {
    format!("{MANAGED_LABEL}={POD_LABEL_VALUE}")
}

//! Normalization applied to an owner's manifest before it is submitted.
//!
//! Every launched job must carry the manager's labels, a restart policy, the
//! worker termination signal and a unique name. The functions here only add
//! what is missing; values set by the owner are preserved unless noted.

use serde_json::{Map, Value, json};

use super::manifest::{Manifest, ManifestError};
use super::random::random_suffix;
use super::{GROUP_LABEL, JOB_LABEL_VALUE, MANAGED_LABEL, POD_LABEL_VALUE};
use crate::config::TerminationSignal;

pub const DEFAULT_RESTART_POLICY: &str = "OnFailure";

/// Applies labels, termination signal, restart policy and a unique name, in
/// that order.
pub fn adjust_manifest(
    manifest: &mut Manifest,
    signal: &TerminationSignal,
) -> Result<(), ManifestError> {
    add_labels(manifest)?;
    ensure_term_on_empty(manifest, signal)?;
    ensure_restart_policy(manifest)?;
    update_job_name(manifest)
}

pub fn ensure_namespace(manifest: &mut Manifest, default: &str) -> Result<(), ManifestError> {
    let metadata = manifest.ensure_path_mapping(&["metadata"])?;
    if metadata.get("namespace").is_none_or(Value::is_null) {
        metadata.insert("namespace".to_string(), json!(default));
    }
    Ok(())
}

/// The group label records the name as it is before `update_job_name`.
pub fn add_labels(manifest: &mut Manifest) -> Result<(), ManifestError> {
    let group = manifest.name().ok_or(ManifestError::MissingName)?.to_string();

    let labels = manifest.ensure_path_mapping(&["metadata", "labels"])?;
    labels.insert(MANAGED_LABEL.to_string(), json!(JOB_LABEL_VALUE));
    labels.insert(GROUP_LABEL.to_string(), json!(group));

    manifest
        .ensure_path_mapping(&["spec", "template", "metadata", "labels"])?
        .insert(MANAGED_LABEL.to_string(), json!(POD_LABEL_VALUE));
    Ok(())
}

pub fn ensure_term_on_empty(
    manifest: &mut Manifest,
    signal: &TerminationSignal,
) -> Result<(), ManifestError> {
    let pod_spec = manifest.ensure_path_mapping(&["spec", "template", "spec"])?;
    let containers = sequence_entry(pod_spec, "containers", "spec.template.spec.containers")?;

    for (index, container) in containers.iter_mut().enumerate() {
        let path = format!("spec.template.spec.containers[{index}]");
        let container = container
            .as_object_mut()
            .ok_or_else(|| ManifestError::NotAMapping { path: path.clone() })?;
        container_term_on_empty(container, signal, &format!("{path}.env"))?;
    }
    Ok(())
}

fn container_term_on_empty(
    container: &mut Map<String, Value>,
    signal: &TerminationSignal,
    path: &str,
) -> Result<(), ManifestError> {
    let env = sequence_entry(container, "env", path)?;

    let is_signal =
        |entry: &Value| entry.get("name").and_then(Value::as_str) == Some(signal.name.as_str());

    let mut seen = false;
    env.retain(|entry| {
        if !is_signal(entry) {
            return true;
        }
        !std::mem::replace(&mut seen, true)
    });

    match env.iter_mut().find(|entry| is_signal(entry)) {
        Some(Value::Object(entry)) => {
            entry.insert("value".to_string(), json!(signal.value));
        }
        _ => env.push(json!({"name": signal.name, "value": signal.value})),
    }
    Ok(())
}

pub fn ensure_restart_policy(manifest: &mut Manifest) -> Result<(), ManifestError> {
    let pod_spec = manifest.ensure_path_mapping(&["spec", "template", "spec"])?;
    if pod_spec.get("restartPolicy").is_none_or(Value::is_null) {
        pod_spec.insert("restartPolicy".to_string(), json!(DEFAULT_RESTART_POLICY));
    }
    Ok(())
}

pub fn update_job_name(manifest: &mut Manifest) -> Result<(), ManifestError> {
    let name = manifest.name().ok_or(ManifestError::MissingName)?;
    let unique = format!("{name}-{}", random_suffix()?);
    manifest
        .ensure_path_mapping(&["metadata"])?
        .insert("name".to_string(), json!(unique));
    Ok(())
}

/// Returns the sequence under `key`, inserting an empty one when missing.
fn sequence_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a mut Vec<Value>, ManifestError> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut().ok_or_else(|| ManifestError::NotASequence {
        path: path.to_string(),
    })
}

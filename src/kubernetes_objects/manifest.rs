use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest root must be a mapping")]
    RootNotAMapping,

    #[error("Manifest value at '{path}' is not a mapping")]
    NotAMapping { path: String },

    #[error("Manifest value at '{path}' is not a sequence")]
    NotASequence { path: String },

    #[error("Manifest has no 'metadata.name'")]
    MissingName,

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to generate random job name suffix: {0}")]
    Random(#[from] getrandom::Error),
}

/// A Kubernetes Job manifest kept as an ordered, untyped document.
///
/// Only the paths touched by conformance are interpreted; everything else is
/// carried through to the API server as written by the owner.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        match value {
            Value::Object(map) => Ok(Manifest(map)),
            _ => Err(ManifestError::RootNotAMapping),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Walks `path` from the root, creating empty mappings for missing or
    /// null segments, and returns the mapping at the end of the path.
    ///
    /// Sibling keys along the way are left untouched.
    pub fn ensure_path_mapping(
        &mut self,
        path: &[&str],
    ) -> Result<&mut Map<String, Value>, ManifestError> {
        let mut current = &mut self.0;
        for (depth, key) in path.iter().enumerate() {
            let slot = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            current = slot
                .as_object_mut()
                .ok_or_else(|| ManifestError::NotAMapping {
                    path: path[..=depth].join("."),
                })?;
        }
        Ok(current)
    }

    /// Returns the value at `path`, if every segment exists.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.0;
        for key in parents {
            current = current.get(*key)?.as_object()?;
        }
        current.get(*last)
    }

    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get_str(&["metadata", "namespace"])
    }
}

impl From<Manifest> for Value {
    fn from(manifest: Manifest) -> Self {
        manifest.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ensure_path_mapping_creates_missing_levels() {
        let mut manifest = Manifest::from_value(json!({"metadata": {"name": "thing"}})).unwrap();

        manifest
            .ensure_path_mapping(&["metadata", "labels"])
            .unwrap()
            .insert("a".to_string(), json!("b"));

        assert_eq!(
            manifest.into_value(),
            json!({"metadata": {"name": "thing", "labels": {"a": "b"}}})
        );
    }

    #[test]
    fn test_ensure_path_mapping_replaces_null() {
        let mut manifest = Manifest::from_value(json!({"spec": {"template": null}})).unwrap();

        manifest
            .ensure_path_mapping(&["spec", "template", "spec"])
            .unwrap();

        assert_eq!(
            manifest.get(&["spec", "template", "spec"]),
            Some(&json!({}))
        );
    }

    #[test]
    fn test_ensure_path_mapping_rejects_scalar_on_path() {
        let mut manifest = Manifest::from_value(json!({"metadata": "oops"})).unwrap();

        let err = manifest
            .ensure_path_mapping(&["metadata", "labels"])
            .unwrap_err();

        assert!(matches!(err, ManifestError::NotAMapping { ref path } if path == "metadata"));
    }

    #[test]
    fn test_from_yaml_requires_mapping_root() {
        assert!(matches!(
            Manifest::from_yaml_str("- a\n- b\n"),
            Err(ManifestError::RootNotAMapping)
        ));

        let manifest = Manifest::from_yaml_str(
            r#"
            apiVersion: batch/v1
            kind: Job
            metadata:
              name: worker-job
            "#,
        )
        .unwrap();
        assert_eq!(manifest.name(), Some("worker-job"));
        assert_eq!(manifest.namespace(), None);
    }
}

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::kubernetes_objects::manifest::{Manifest, ManifestError};

/// Something that knows which Job runs its queue workers.
pub trait JobOwner {
    /// A fresh manifest for one worker job. Called once per launch attempt.
    fn job_manifest(&self) -> Manifest;

    /// Per-owner worker ceiling. `None` uses `Config::max_workers`.
    fn max_workers(&self) -> Option<u32> {
        None
    }
}

#[derive(Error, Debug)]
pub enum TemplateLoadError {
    #[error("Failed to read manifest '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid manifest '{}': {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: ManifestError,
    },
}

/// Owner backed by a manifest loaded once, typically from a YAML file.
#[derive(Debug, Clone)]
pub struct ManifestTemplate {
    manifest: Manifest,
    max_workers: Option<u32>,
}

impl ManifestTemplate {
    pub fn new(manifest: Manifest) -> Self {
        ManifestTemplate {
            manifest,
            max_workers: None,
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self, TemplateLoadError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| TemplateLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        let manifest =
            Manifest::from_yaml_str(&content).map_err(|source| TemplateLoadError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(ManifestTemplate::new(manifest))
    }

    pub fn with_max_workers(mut self, max_workers: Option<u32>) -> Self {
        self.max_workers = max_workers;
        self
    }
}

impl JobOwner for ManifestTemplate {
    fn job_manifest(&self) -> Manifest {
        self.manifest.clone()
    }

    fn max_workers(&self) -> Option<u32> {
        self.max_workers
    }
}

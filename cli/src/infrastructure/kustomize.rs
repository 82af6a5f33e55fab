//! Patch engine
//!
//! Writes the rendered manifests, the patch files and a `kustomization.yaml`
//! into a work directory, then lets `kubectl kustomize` merge them. The work
//! directory is left in place after a run so it can be inspected.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::fs::FileSystem;
use super::process::{CommandRunner, Invocation};
use crate::domain::kustomization::{build_kustomization, KUSTOMIZATION_FILE, RESOURCES_FILE};
use crate::domain::Patch;
use crate::error::PatchError;
use crate::tools::tools::KUBECTL;

pub struct PatchEngine {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
}

impl PatchEngine {
    pub fn new(fs: Arc<dyn FileSystem>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { fs, runner }
    }

    /// Apply `patches` to `manifests` and return the merged manifests.
    ///
    /// With no patches the manifests are returned unchanged and neither the
    /// filesystem nor kubectl is touched.
    pub fn apply(&self, manifests: &str, patches: &[Patch], work_dir: &Path) -> Result<String, PatchError> {
        if patches.is_empty() {
            return Ok(manifests.to_string());
        }

        self.fs.mkdir_all(work_dir).map_err(|source| PatchError::CreateDir {
            path: work_dir.to_path_buf(),
            source,
        })?;

        self.write(&work_dir.join(RESOURCES_FILE), manifests.as_bytes())?;

        let build = build_kustomization(patches)?;
        for file in &build.files {
            self.write(&work_dir.join(&file.filename), file.content.as_bytes())?;
        }

        let kustomization = serde_yaml::to_string(&build.kustomization).map_err(|e| PatchError::Serialize {
            what: KUSTOMIZATION_FILE.to_string(),
            message: e.to_string(),
        })?;
        self.write(&work_dir.join(KUSTOMIZATION_FILE), kustomization.as_bytes())?;

        info!(
            "Merging {} patch(es) ({} file(s)) in {}",
            build.kustomization.patches.len(),
            build.files.len(),
            work_dir.display()
        );

        let invocation = Invocation::new(KUBECTL, ["kustomize".to_string(), work_dir.display().to_string()]);
        let output = self.runner.run(&invocation)?;

        if !output.success {
            return Err(PatchError::MergeFailed {
                output: output.combined(),
            });
        }

        Ok(output.stdout)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), PatchError> {
        debug!("Writing {}", path.display());
        self.fs.write_file(path, contents).map_err(|source| PatchError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

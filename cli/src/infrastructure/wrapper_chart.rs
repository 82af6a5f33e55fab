//! Wrapper charts
//!
//! Helm's release bookkeeping needs a chart, but dx installs manifests that
//! were already rendered and patched. The wrapper chart stores them as a
//! plain file and emits it through `.Files.Get`, so Helm never re-templates
//! the content.
//!
//! Layout: `<stateDir>/<context>/charts/<release>/{Chart.yaml, files/, templates/}`

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::fs::FileSystem;
use crate::error::WrapperError;

const MANIFESTS_FILE: &str = "files/manifests.yaml";
const TEMPLATE: &str = "{{ .Files.Get \"files/manifests.yaml\" }}\n";
const CHART_VERSION: &str = "0.1.0";

/// Input for generating a wrapper chart
#[derive(Debug, Clone, PartialEq)]
pub struct WrapperChartConfig {
    pub release_name: String,
    pub context_name: String,
    pub patched_manifests: String,
    pub original_chart_name: String,
    pub original_chart_path: PathBuf,
}

/// Turns a manifest blob into an installable chart directory
pub trait ChartWrapper: Send + Sync {
    fn generate(&self, config: &WrapperChartConfig) -> Result<PathBuf, WrapperError>;
    fn cleanup(&self, context_name: &str, service_name: &str) -> Result<(), WrapperError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartMetadata<'a> {
    api_version: &'static str,
    name: &'a str,
    description: String,
    #[serde(rename = "type")]
    chart_type: &'static str,
    version: &'static str,
    annotations: BTreeMap<&'static str, String>,
}

/// Writes wrapper charts under the state directory
pub struct FsChartWrapper {
    fs: Arc<dyn FileSystem>,
    state_dir: PathBuf,
}

impl FsChartWrapper {
    pub fn new(fs: Arc<dyn FileSystem>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            state_dir: state_dir.into(),
        }
    }

    pub fn chart_dir(&self, context_name: &str, release_name: &str) -> PathBuf {
        self.state_dir.join(context_name).join("charts").join(release_name)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), WrapperError> {
        debug!("Writing {}", path.display());
        self.fs.write_file(path, contents).map_err(|source| WrapperError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    fn mkdir(&self, path: &Path) -> Result<(), WrapperError> {
        self.fs.mkdir_all(path).map_err(|source| WrapperError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ChartWrapper for FsChartWrapper {
    fn generate(&self, config: &WrapperChartConfig) -> Result<PathBuf, WrapperError> {
        let chart_dir = self.chart_dir(&config.context_name, &config.release_name);

        // Drop stale files from a previous generation
        self.fs.remove_all(&chart_dir).map_err(|source| WrapperError::Cleanup {
            path: chart_dir.clone(),
            source,
        })?;
        self.mkdir(&chart_dir.join("files"))?;
        self.mkdir(&chart_dir.join("templates"))?;

        let mut annotations = BTreeMap::new();
        annotations.insert("dx/original-chart", config.original_chart_name.clone());
        annotations.insert(
            "dx/original-chart-path",
            config.original_chart_path.display().to_string(),
        );

        let metadata = ChartMetadata {
            api_version: "v2",
            name: &config.release_name,
            description: format!("Pre-rendered manifests of {} managed by dx", config.original_chart_name),
            chart_type: "application",
            version: CHART_VERSION,
            annotations,
        };
        let chart_yaml = serde_yaml::to_string(&metadata).map_err(|e| WrapperError::Serialize {
            message: e.to_string(),
        })?;

        self.write(&chart_dir.join("Chart.yaml"), chart_yaml.as_bytes())?;
        self.write(&chart_dir.join(MANIFESTS_FILE), config.patched_manifests.as_bytes())?;
        self.write(&chart_dir.join("templates").join("manifests.yaml"), TEMPLATE.as_bytes())?;

        Ok(chart_dir)
    }

    fn cleanup(&self, context_name: &str, service_name: &str) -> Result<(), WrapperError> {
        let chart_dir = self.chart_dir(context_name, service_name);
        debug!("Removing wrapper chart {}", chart_dir.display());
        self.fs.remove_all(&chart_dir).map_err(|source| WrapperError::Cleanup {
            path: chart_dir,
            source,
        })
    }
}

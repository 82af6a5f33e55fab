//! Service-specific configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A Helm-deployed service of the distributed application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Service name, also used as the Helm release name
    pub name: String,

    /// Directory holding the chart sources
    pub helm_path: PathBuf,

    /// Chart location relative to `helm_path`
    #[serde(default = "default_chart_relative_path")]
    pub helm_chart_relative_path: String,

    /// Extra `helm template` arguments; each entry is rendered through the
    /// templater before use
    #[serde(default)]
    pub helm_args: Vec<String>,
}

fn default_chart_relative_path() -> String {
    ".".to_string()
}

impl ServiceConfig {
    /// Resolved chart directory
    pub fn chart_path(&self) -> PathBuf {
        join_relative(&self.helm_path, &self.helm_chart_relative_path)
    }
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    match relative.trim() {
        "" | "." => base.to_path_buf(),
        rel => base.join(rel),
    }
}

/// A Kubernetes Service whose traffic is redirected to a local process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalServiceConfig {
    /// Name of the Kubernetes Service to redirect
    pub name: String,

    /// Port the local process listens on
    pub local_port: u16,

    /// Port the Service exposes in the cluster
    pub kubernetes_port: u16,

    /// Path the dev-proxy probes before routing to the local process
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,

    /// Pod selector of the in-cluster fallback
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

fn default_health_check_path() -> String {
    "/".to_string()
}

//! Helm client
//!
//! Wraps the `helm` CLI: template rendering, release install/upgrade,
//! uninstall and label-selected release listing. The namespace flag is left
//! out entirely when the namespace is empty.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::process::{CommandOutput, CommandRunner, Invocation};
use crate::domain::managed_by_selector;
use crate::error::HelmError;
use crate::tools::tools::HELM;

/// Operations dx needs from Helm
pub trait HelmClient: Send + Sync {
    /// Render a chart to manifests (`helm template`)
    fn template(&self, name: &str, chart_path: &Path, namespace: &str, args: &[String]) -> Result<String, HelmError>;

    /// Install or upgrade a release from a wrapper chart, labelled `managed-by=dx`
    fn upgrade_from_manifests(&self, name: &str, namespace: &str, chart_path: &Path) -> Result<(), HelmError>;

    fn uninstall(&self, name: &str, namespace: &str) -> Result<(), HelmError>;

    /// Release names matching a label selector
    fn list(&self, selector: &str, namespace: &str) -> Result<Vec<String>, HelmError>;
}

/// `HelmClient` backed by the helm binary
pub struct HelmCli {
    runner: Arc<dyn CommandRunner>,
}

#[derive(Deserialize)]
struct ListedRelease {
    name: String,
}

fn push_namespace(args: &mut Vec<String>, namespace: &str) {
    if !namespace.is_empty() {
        args.push("--namespace".to_string());
        args.push(namespace.to_string());
    }
}

impl HelmCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn run(&self, invocation: Invocation) -> Result<CommandOutput, HelmError> {
        Ok(self.runner.run(&invocation)?)
    }
}

impl HelmClient for HelmCli {
    fn template(&self, name: &str, chart_path: &Path, namespace: &str, args: &[String]) -> Result<String, HelmError> {
        let mut helm_args = vec!["template".to_string(), name.to_string(), ".".to_string()];
        push_namespace(&mut helm_args, namespace);
        helm_args.extend(args.iter().cloned());

        info!("Rendering chart {} for {}", chart_path.display(), name);
        let output = self.run(Invocation::new(HELM, helm_args).in_dir(chart_path))?;

        if !output.success {
            return Err(HelmError::Template {
                release: name.to_string(),
                output: output.combined(),
            });
        }

        debug!("Rendered {} bytes of manifests for {}", output.stdout.len(), name);
        Ok(output.stdout)
    }

    fn upgrade_from_manifests(&self, name: &str, namespace: &str, chart_path: &Path) -> Result<(), HelmError> {
        let mut args = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            name.to_string(),
            chart_path.display().to_string(),
        ];
        push_namespace(&mut args, namespace);
        args.push("--labels".to_string());
        args.push(managed_by_selector());

        info!("Upgrading release {} in namespace '{}'", name, namespace);
        let output = self.run(Invocation::new(HELM, args))?;

        if !output.success {
            return Err(HelmError::Upgrade {
                release: name.to_string(),
                output: output.combined(),
            });
        }

        Ok(())
    }

    fn uninstall(&self, name: &str, namespace: &str) -> Result<(), HelmError> {
        let mut args = vec!["uninstall".to_string(), name.to_string()];
        push_namespace(&mut args, namespace);

        info!("Uninstalling release {} from namespace '{}'", name, namespace);
        let output = self.run(Invocation::new(HELM, args))?;

        if !output.success {
            return Err(HelmError::Uninstall {
                release: name.to_string(),
                output: output.combined(),
            });
        }

        Ok(())
    }

    fn list(&self, selector: &str, namespace: &str) -> Result<Vec<String>, HelmError> {
        let mut args = vec!["list".to_string(), "--selector".to_string(), selector.to_string()];
        push_namespace(&mut args, namespace);
        args.push("--output".to_string());
        args.push("json".to_string());

        let output = self.run(Invocation::new(HELM, args))?;

        if !output.success {
            return Err(HelmError::List {
                output: output.combined(),
            });
        }

        parse_release_names(&output.stdout)
    }
}

/// Release names from `helm list --output json`
fn parse_release_names(json: &str) -> Result<Vec<String>, HelmError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let releases: Vec<ListedRelease> = serde_json::from_str(json).map_err(|e| HelmError::ParseList {
        message: e.to_string(),
    })?;

    Ok(releases.into_iter().map(|r| r.name).collect())
}

//! Deploy service - orchestrates a single service install/uninstall
//!
//! Install pipeline:
//! render helm args → security check → namespace → helm template →
//! routing patches → kubectl kustomize → wrapper chart → helm upgrade
//!
//! Each call runs to completion on the calling thread. Nothing is retried;
//! callers re-run the whole pipeline if they want to.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConfigRepository, ServiceConfig};
use crate::domain::{build_patches, managed_by_selector, validate_helm_args};
use crate::error::DeployError;
use crate::infrastructure::{
    ChartWrapper, HelmClient, NamespaceResolver, PatchEngine, Templater, WrapperChartConfig,
};

/// Manifests ready to be wrapped, with where they go
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedService {
    pub context: String,
    pub namespace: String,
    pub manifests: String,
}

/// Output of `helm template` before any patching
struct Templated {
    namespace: String,
    manifests: String,
}

pub struct DeployService {
    config: Arc<dyn ConfigRepository>,
    helm: Arc<dyn HelmClient>,
    engine: PatchEngine,
    wrapper: Arc<dyn ChartWrapper>,
    templater: Arc<dyn Templater>,
    namespaces: Arc<dyn NamespaceResolver>,
    state_dir: PathBuf,
    clock: fn() -> DateTime<Utc>,
}

impl DeployService {
    pub fn new(
        config: Arc<dyn ConfigRepository>,
        helm: Arc<dyn HelmClient>,
        engine: PatchEngine,
        wrapper: Arc<dyn ChartWrapper>,
        templater: Arc<dyn Templater>,
        namespaces: Arc<dyn NamespaceResolver>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            helm,
            engine,
            wrapper,
            templater,
            namespaces,
            state_dir: state_dir.into(),
            clock: Utc::now,
        }
    }

    /// Use a fixed time source for the pod recreation annotation
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Scratch directory of the patch engine for one service
    pub fn work_dir(&self, context_name: &str, service_name: &str) -> PathBuf {
        self.state_dir
            .join(context_name)
            .join("kustomize")
            .join(service_name)
    }

    /// Render each Helm argument; the first failure aborts
    fn render_args(&self, service: &ServiceConfig) -> Result<Vec<String>, DeployError> {
        let values = self.config.template_values()?;

        service
            .helm_args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let name = format!("{}-helm-arg-{}", service.name, i);
                Ok(self.templater.render(arg, &name, &values)?)
            })
            .collect()
    }

    fn template(&self, service: &ServiceConfig) -> Result<Templated, DeployError> {
        let args = self.render_args(service)?;
        validate_helm_args(&args)?;

        let namespace = self.namespaces.current_namespace();
        let manifests = self
            .helm
            .template(&service.name, &service.chart_path(), &namespace, &args)?;

        Ok(Templated {
            namespace,
            manifests,
        })
    }

    /// Template and patch a service without installing it
    pub fn render(&self, service: &ServiceConfig) -> Result<RenderedService, DeployError> {
        let templated = self.template(service)?;
        let context = self.config.current_context()?;

        let patches = build_patches(&context.local_services, (self.clock)());
        let work_dir = self.work_dir(&context.name, &service.name);
        let manifests = self.engine.apply(&templated.manifests, &patches, &work_dir)?;

        Ok(RenderedService {
            context: context.name,
            namespace: templated.namespace,
            manifests,
        })
    }

    /// Install or upgrade a service with traffic routing patches applied
    pub fn install(&self, service: &ServiceConfig) -> Result<(), DeployError> {
        info!("Installing {}", service.name);
        let rendered = self.render(service)?;
        self.wrap_and_upgrade(service, rendered)
    }

    /// Install or upgrade the dev-proxy; its manifests are not patched
    pub fn install_dev_proxy(&self, service: &ServiceConfig) -> Result<(), DeployError> {
        info!("Installing dev-proxy {}", service.name);
        let templated = self.template(service)?;
        let context = self.config.current_context()?;

        self.wrap_and_upgrade(
            service,
            RenderedService {
                context: context.name,
                namespace: templated.namespace,
                manifests: templated.manifests,
            },
        )
    }

    fn wrap_and_upgrade(&self, service: &ServiceConfig, rendered: RenderedService) -> Result<(), DeployError> {
        let chart_dir = self.wrapper.generate(&WrapperChartConfig {
            release_name: service.name.clone(),
            context_name: rendered.context,
            patched_manifests: rendered.manifests,
            original_chart_name: service.name.clone(),
            original_chart_path: service.chart_path(),
        })?;

        self.helm
            .upgrade_from_manifests(&service.name, &rendered.namespace, &chart_dir)?;

        info!("Installed {} into namespace '{}'", service.name, rendered.namespace);
        Ok(())
    }

    /// Remove a release. Wrapper chart cleanup is best-effort: once Helm has
    /// removed the release, the uninstall counts as successful.
    pub fn uninstall(&self, service_name: &str) -> Result<(), DeployError> {
        let namespace = self.namespaces.current_namespace();
        self.helm.uninstall(service_name, &namespace)?;

        match self.config.current_context() {
            Ok(context) => {
                if let Err(e) = self.wrapper.cleanup(&context.name, service_name) {
                    warn!("Could not clean up wrapper chart for {}: {}", service_name, e);
                }
            }
            Err(e) => warn!("Skipping wrapper chart cleanup for {}: {}", service_name, e),
        }

        info!("Uninstalled {}", service_name);
        Ok(())
    }

    /// dx-managed releases in the active namespace
    pub fn deployed_releases(&self) -> Result<Vec<String>, DeployError> {
        let namespace = self.namespaces.current_namespace();
        Ok(self.helm.list(&managed_by_selector(), &namespace)?)
    }

    /// True when more than one dx-managed release exists. The dev-proxy is
    /// itself a dx release, so a single release does not count.
    pub fn has_deployed_services(&self) -> Result<bool, DeployError> {
        Ok(self.deployed_releases()?.len() > 1)
    }
}

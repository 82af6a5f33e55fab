//! Command handlers
//!
//! Handlers are thin: they pick services from the active context, fan the
//! per-service pipelines out and print a summary.

pub mod install;
pub mod proxy;
pub mod render;
pub mod status;
pub mod uninstall;

mod fanout;

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ContextConfig, ServiceConfig};
use crate::error::ConfigError;
use crate::infrastructure::FileSystem;
use crate::services::DeployService;

pub use fanout::{finish, run_parallel, with_lock, ServiceOutcome};

/// Everything a command needs, built once in `main`
pub struct App {
    pub context: ContextConfig,
    pub deploy: Arc<DeployService>,
    pub fs: Arc<dyn FileSystem>,
    pub state_dir: PathBuf,
}

impl App {
    /// Services named on the command line (deduplicated, in order), or all
    /// services of the context with `--all`
    pub fn select_services(&self, names: &[String], all: bool) -> Result<Vec<ServiceConfig>> {
        if all {
            return Ok(self.context.services.clone());
        }

        if names.is_empty() {
            anyhow::bail!("No services given; name one or more services or pass --all");
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let service = self.context.service(name).ok_or_else(|| ConfigError::UnknownService {
                name: name.clone(),
                context: self.context.name.clone(),
            })?;
            selected.push(service.clone());
        }

        Ok(selected)
    }

    /// The dev-proxy chart of the active context
    pub fn dev_proxy(&self) -> Result<&ServiceConfig> {
        self.context
            .dev_proxy
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Context '{}' has no devProxy configured", self.context.name))
    }

    pub fn lock_path(&self, service_name: &str) -> PathBuf {
        self.state_dir
            .join(&self.context.name)
            .join("locks")
            .join(format!("{}.lock", service_name))
    }
}

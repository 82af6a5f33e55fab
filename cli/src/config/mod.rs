//! # dx Configuration
//!
//! A single YAML file describes every context (cluster profile) the developer
//! works against:
//!
//! ```yaml
//! currentContext: dev
//! stateDir: ~/.dx            # optional
//! contexts:
//!   - name: dev
//!     values:
//!       registry: ghcr.io/acme
//!     services:
//!       - name: api
//!         helmPath: ./charts
//!         helmChartRelativePath: api
//!         helmArgs: ["--set", "image.repository={{ .registry }}/api"]
//!     localServices:
//!       - name: api
//!         localPort: 8080
//!         kubernetesPort: 80
//!         healthCheckPath: /healthz
//!     devProxy:
//!       name: dev-proxy
//!       helmPath: ./charts/dev-proxy
//!       helmArgs: ["--set-json", "routes={{ .routes }}"]
//! ```
//!
//! The file is picked from `--config`, then `DX_CONFIG`, then `./dx.yaml`.

mod context;
mod service;

pub use context::ContextConfig;
pub use service::{LocalServiceConfig, ServiceConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::infrastructure::templater::TemplateValues;

pub const DEFAULT_CONFIG_FILE: &str = "dx.yaml";

/// Root of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DxConfig {
    pub current_context: String,

    /// Where dx keeps work directories, wrapper charts and locks
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
}

impl DxConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate YAML config content
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ConfigError::Invalid { problems });
        }

        Ok(config)
    }

    /// Every problem with this config, not just the first
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.context(&self.current_context).is_none() {
            problems.push(format!(
                "currentContext '{}' does not match any context",
                self.current_context
            ));
        }

        let mut names = std::collections::HashSet::new();
        for context in &self.contexts {
            if !names.insert(context.name.as_str()) {
                problems.push(format!("Duplicate context '{}'", context.name));
            }
            problems.extend(context.validate());
        }

        problems
    }

    pub fn context(&self, name: &str) -> Option<&ContextConfig> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// State directory: `DX_STATE_DIR`, then `stateDir`, then `$HOME/.dx`,
    /// then `./.dx`
    pub fn resolve_state_dir(&self) -> PathBuf {
        resolve_state_dir(
            std::env::var_os("DX_STATE_DIR").map(PathBuf::from),
            self.state_dir.as_deref(),
            std::env::var_os("HOME").map(PathBuf::from),
        )
    }
}

fn resolve_state_dir(env_override: Option<PathBuf>, configured: Option<&Path>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_override.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }

    if let Some(dir) = configured {
        return match (dir.strip_prefix("~"), home.as_ref()) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => dir.to_path_buf(),
        };
    }

    match home {
        Some(home) => home.join(".dx"),
        None => PathBuf::from(".dx"),
    }
}

/// Pick the config file: `--config` (or `DX_CONFIG`), then `./dx.yaml`
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Read access to the active configuration
pub trait ConfigRepository: Send + Sync {
    /// The currently selected context
    fn current_context(&self) -> Result<ContextConfig, ConfigError>;

    /// Values for rendering Helm arguments
    fn template_values(&self) -> Result<TemplateValues, ConfigError> {
        Ok(self.current_context()?.template_values())
    }
}

/// Configuration loaded once from a YAML file
pub struct FileConfigRepository {
    config: DxConfig,
}

impl FileConfigRepository {
    pub fn new(config: DxConfig) -> Self {
        Self { config }
    }
}

impl ConfigRepository for FileConfigRepository {
    fn current_context(&self) -> Result<ContextConfig, ConfigError> {
        self.config
            .context(&self.config.current_context)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownContext {
                name: self.config.current_context.clone(),
            })
    }
}

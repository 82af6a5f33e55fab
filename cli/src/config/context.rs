//! Context configuration: one target cluster/profile with its services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::service::{LocalServiceConfig, ServiceConfig};
use crate::domain::routing::MAX_LOCAL_SERVICES;
use crate::domain::upstream_routes;
use crate::infrastructure::templater::TemplateValues;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    pub name: String,

    /// Services deployed into the cluster through Helm
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Services running on the developer machine
    #[serde(default)]
    pub local_services: Vec<LocalServiceConfig>,

    /// Chart of the in-cluster dev-proxy
    #[serde(default)]
    pub dev_proxy: Option<ServiceConfig>,

    /// Values available to Helm argument templates
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl ContextConfig {
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Values for Helm argument templates: user values plus `context` and
    /// `routes` (the dev-proxy routing table as a JSON array)
    pub fn template_values(&self) -> TemplateValues {
        let mut values: TemplateValues = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        values.insert("context".to_string(), Value::from(self.name.as_str()));

        let routes = serde_json::to_value(upstream_routes(&self.local_services))
            .unwrap_or_else(|_| Value::Array(Vec::new()));
        values.insert("routes".to_string(), routes);

        values
    }

    /// Every problem with this context
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("Context name must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                problems.push(format!("Context '{}': service name must not be empty", self.name));
            } else if !seen.insert(service.name.as_str()) {
                problems.push(format!("Context '{}': duplicate service '{}'", self.name, service.name));
            }
        }

        if self.local_services.len() > MAX_LOCAL_SERVICES {
            problems.push(format!(
                "Context '{}': {} local services exceed the limit of {}",
                self.name,
                self.local_services.len(),
                MAX_LOCAL_SERVICES
            ));
        }

        let mut seen_local = HashSet::new();
        for local in &self.local_services {
            if !seen_local.insert(local.name.as_str()) {
                problems.push(format!(
                    "Context '{}': duplicate local service '{}'",
                    self.name, local.name
                ));
            }
            if local.local_port == 0 || local.kubernetes_port == 0 {
                problems.push(format!(
                    "Context '{}': local service '{}' needs non-zero localPort and kubernetesPort",
                    self.name, local.name
                ));
            }
        }

        problems
    }
}

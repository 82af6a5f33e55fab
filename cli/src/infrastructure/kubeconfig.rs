//! Active namespace resolution from the local kubeconfig

use kube::config::Kubeconfig;
use tracing::{debug, warn};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Supplies the namespace releases are installed into
pub trait NamespaceResolver: Send + Sync {
    fn current_namespace(&self) -> String;
}

/// Reads the kubeconfig (`KUBECONFIG` or `~/.kube/config`) on every call.
/// An unreadable kubeconfig resolves to `default`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KubeconfigNamespace;

impl NamespaceResolver for KubeconfigNamespace {
    fn current_namespace(&self) -> String {
        match Kubeconfig::read() {
            Ok(config) => namespace_for_current_context(&config),
            Err(e) => {
                warn!("Could not read kubeconfig, using namespace '{}': {}", DEFAULT_NAMESPACE, e);
                DEFAULT_NAMESPACE.to_string()
            }
        }
    }
}

/// Namespace of the current context, or `default` when none is set
pub fn namespace_for_current_context(config: &Kubeconfig) -> String {
    let namespace = config
        .current_context
        .as_deref()
        .and_then(|current| config.contexts.iter().find(|c| c.name == current))
        .and_then(|named| named.context.as_ref())
        .and_then(|context| context.namespace.clone())
        .filter(|ns| !ns.is_empty());

    match namespace {
        Some(ns) => ns,
        None => {
            debug!("No namespace on current kube context, using '{}'", DEFAULT_NAMESPACE);
            DEFAULT_NAMESPACE.to_string()
        }
    }
}

//! Patch model
//!
//! A `Patch` says "apply these JSON Pointer operations to every rendered
//! resource matching this Kind (and optionally Name)". Matching itself is done
//! by kustomize; this module only describes the intent.

use k8s_openapi::api::apps::v1 as apps_v1;
use k8s_openapi::api::batch::v1 as batch_v1;
use k8s_openapi::api::core::v1 as core_v1;
use k8s_openapi::api::networking::v1 as networking_v1;
use k8s_openapi::api::rbac::v1 as rbac_v1;
use k8s_openapi::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which rendered resources a patch applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchTarget {
    pub kind: String,
    /// Empty matches every resource of `kind`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl PatchTarget {
    /// Target every resource of a kind
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: String::new(),
        }
    }

    /// Target a single named resource
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// A single JSON Pointer operation. `Add` and `Replace` carry a value,
/// `Remove` cannot.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Add {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Replace {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, Self::Add { .. })
    }
}

/// Operations applied to all resources matching `target`
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub target: PatchTarget,
    pub operations: Vec<PatchOperation>,
}

impl Patch {
    pub fn new(target: PatchTarget, operations: Vec<PatchOperation>) -> Self {
        Self { target, operations }
    }
}

/// Escape a JSON Pointer segment (RFC 6901): `~` -> `~0`, then `/` -> `~1`
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape a JSON Pointer segment. `~1` is decoded before `~0` so that
/// `~01` yields `~1`.
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Split a pointer into unescaped segments. The empty pointer addresses the
/// whole document and has no segments.
pub fn pointer_segments(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }

    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .map(unescape_segment)
        .collect()
}

/// apiVersion for a kind, defaulting to `v1` for kinds not in the table
pub fn api_version_for_kind(kind: &str) -> &'static str {
    match kind {
        "Deployment" => apps_v1::Deployment::API_VERSION,
        "StatefulSet" => apps_v1::StatefulSet::API_VERSION,
        "DaemonSet" => apps_v1::DaemonSet::API_VERSION,
        "ReplicaSet" => apps_v1::ReplicaSet::API_VERSION,
        "Service" => core_v1::Service::API_VERSION,
        "ConfigMap" => core_v1::ConfigMap::API_VERSION,
        "Secret" => core_v1::Secret::API_VERSION,
        "Namespace" => core_v1::Namespace::API_VERSION,
        "ServiceAccount" => core_v1::ServiceAccount::API_VERSION,
        "PersistentVolumeClaim" => core_v1::PersistentVolumeClaim::API_VERSION,
        "Ingress" => networking_v1::Ingress::API_VERSION,
        "Job" => batch_v1::Job::API_VERSION,
        "CronJob" => batch_v1::CronJob::API_VERSION,
        "Role" => rbac_v1::Role::API_VERSION,
        "RoleBinding" => rbac_v1::RoleBinding::API_VERSION,
        "ClusterRole" => rbac_v1::ClusterRole::API_VERSION,
        "ClusterRoleBinding" => rbac_v1::ClusterRoleBinding::API_VERSION,
        _ => "v1",
    }
}

/// Base name for the patch file of an `add` operation.
///
/// Uses the last pointer segment, keeps only what follows a decoded `/`
/// (annotation keys like `kubectl.kubernetes.io~1recreatedAt`), and turns
/// camelCase into lower kebab-case.
pub fn patch_name_from_path(path: &str) -> String {
    let Some(last) = path.rsplit('/').next().filter(|s| !s.is_empty()) else {
        return "patch".to_string();
    };

    let decoded = unescape_segment(last);
    let tail = decoded.rsplit('/').next().unwrap_or(&decoded);

    let mut name = String::with_capacity(tail.len() + 4);
    for (i, c) in tail.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            name.push('-');
        }
        name.extend(c.to_lowercase());
    }

    if name.is_empty() {
        "patch".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unescape_order() {
        assert_eq!(unescape_segment("~01"), "~1");
        assert_eq!(unescape_segment("~0~1"), "~/");
        assert_eq!(unescape_segment("a~1b"), "a/b");
    }

    #[test]
    fn test_escape_round_trip() {
        for s in ["plain", "app.kubernetes.io", "", "camelCase"] {
            assert_eq!(unescape_segment(&escape_segment(s)), s);
        }
        assert_eq!(
            escape_segment("kubectl.kubernetes.io/restartedAt"),
            "kubectl.kubernetes.io~1restartedAt"
        );
        assert_eq!(unescape_segment(&escape_segment("~/")), "~/");
    }

    #[test]
    fn test_pointer_segments() {
        assert!(pointer_segments("").is_empty());
        assert_eq!(pointer_segments("/data/key"), vec!["data", "key"]);
        assert_eq!(
            pointer_segments("/metadata/annotations/example.com~1owner"),
            vec!["metadata", "annotations", "example.com/owner"]
        );
        assert_eq!(pointer_segments("/"), vec![""]);
    }

    #[test]
    fn test_api_version_table() {
        assert_eq!(api_version_for_kind("Deployment"), "apps/v1");
        assert_eq!(api_version_for_kind("StatefulSet"), "apps/v1");
        assert_eq!(api_version_for_kind("Service"), "v1");
        assert_eq!(api_version_for_kind("PersistentVolumeClaim"), "v1");
        assert_eq!(api_version_for_kind("Ingress"), "networking.k8s.io/v1");
        assert_eq!(api_version_for_kind("CronJob"), "batch/v1");
        assert_eq!(api_version_for_kind("ClusterRoleBinding"), "rbac.authorization.k8s.io/v1");
    }

    #[test]
    fn test_api_version_defaults_to_v1() {
        for kind in ["Widget", "", "deployment", "HorizontalPodAutoscaler"] {
            assert_eq!(api_version_for_kind(kind), "v1");
        }
    }

    #[test]
    fn test_patch_name_from_path() {
        assert_eq!(patch_name_from_path("/data/key"), "key");
        assert_eq!(
            patch_name_from_path("/spec/template/metadata/annotations/kubectl.kubernetes.io~1recreatedAt"),
            "recreated-at"
        );
        assert_eq!(patch_name_from_path("/spec/serviceAccountName"), "service-account-name");
        assert_eq!(patch_name_from_path(""), "patch");
        assert_eq!(patch_name_from_path("/"), "patch");
    }

    #[test]
    fn test_operation_accessors() {
        let add = PatchOperation::add("/data/key", "val");
        assert!(add.is_add());

        let replace = PatchOperation::replace("/spec/ports/0/targetPort", 18080);
        assert!(!replace.is_add());
        assert_eq!(
            replace,
            PatchOperation::Replace {
                path: "/spec/ports/0/targetPort".to_string(),
                value: json!(18080),
            }
        );

        assert!(!PatchOperation::remove("/spec/replicas").is_add());
    }
}

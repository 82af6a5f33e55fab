//! Traffic routing patches
//!
//! Every install recreates all Deployment pods (so a fresh local image or a
//! freshly patched selector always takes effect) and points each locally
//! overridden Service at the dev-proxy, on a per-service upstream port.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::patch::{escape_segment, Patch, PatchOperation, PatchTarget};
use crate::config::LocalServiceConfig;

/// Selector value carried by the dev-proxy pods
pub const DEV_PROXY_APP: &str = "dev-proxy";

/// Upstream port assigned to the first local service
pub const FIRST_UPSTREAM_PORT: u16 = 18080;

/// Local services per context before upstream ports run past 65535
pub const MAX_LOCAL_SERVICES: usize = (u16::MAX - FIRST_UPSTREAM_PORT) as usize + 1;

const RECREATED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/recreatedAt";

/// Where the dev-proxy listens for one locally overridden Service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamRoute {
    pub service: String,
    pub upstream_port: u16,
    pub local_port: u16,
    pub kubernetes_port: u16,
    pub health_check_path: String,
    /// Pods to fall back to while the local process is unhealthy
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fallback_selector: BTreeMap<String, String>,
}

/// Assign upstream ports sequentially from 18080, in configuration order.
/// Services past `MAX_LOCAL_SERVICES` get no route; config validation
/// rejects such contexts.
pub fn upstream_routes(local_services: &[LocalServiceConfig]) -> Vec<UpstreamRoute> {
    local_services
        .iter()
        .zip(FIRST_UPSTREAM_PORT..=u16::MAX)
        .map(|(local, upstream_port)| UpstreamRoute {
            service: local.name.clone(),
            upstream_port,
            local_port: local.local_port,
            kubernetes_port: local.kubernetes_port,
            health_check_path: local.health_check_path.clone(),
            fallback_selector: local.selector.clone(),
        })
        .collect()
}

/// Annotation patch applied to every Deployment
pub fn recreate_pods_patch(now: DateTime<Utc>) -> Patch {
    let path = format!(
        "/spec/template/metadata/annotations/{}",
        escape_segment(RECREATED_AT_ANNOTATION)
    );

    Patch::new(
        PatchTarget::kind("Deployment"),
        vec![PatchOperation::add(
            path,
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        )],
    )
}

/// Redirect a Service to the dev-proxy.
///
/// Only the first port is retargeted; Services exposing several ports keep
/// their remaining ports pointed at the original pods' target ports.
pub fn service_route_patch(route: &UpstreamRoute) -> Patch {
    Patch::new(
        PatchTarget::named("Service", route.service.as_str()),
        vec![
            PatchOperation::replace("/spec/selector/app", DEV_PROXY_APP),
            PatchOperation::replace("/spec/ports/0/targetPort", route.upstream_port),
        ],
    )
}

/// All routing patches for one install: the Deployment-wide recreate patch
/// followed by one Service patch per local service
pub fn build_patches(local_services: &[LocalServiceConfig], now: DateTime<Utc>) -> Vec<Patch> {
    let routes = upstream_routes(local_services);

    std::iter::once(recreate_pods_patch(now))
        .chain(routes.iter().map(service_route_patch))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn local(name: &str, port: u16) -> LocalServiceConfig {
        LocalServiceConfig {
            name: name.to_string(),
            local_port: port,
            kubernetes_port: 80,
            health_check_path: "/healthz".to_string(),
            selector: Default::default(),
        }
    }

    #[test]
    fn test_upstream_ports_stop_at_u16_max() {
        let locals: Vec<_> = (0..=MAX_LOCAL_SERVICES).map(|i| local(&format!("svc-{i}"), 8080)).collect();

        let routes = upstream_routes(&locals);

        assert_eq!(routes.len(), MAX_LOCAL_SERVICES);
        assert_eq!(routes.last().unwrap().upstream_port, u16::MAX);
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_no_local_services_still_recreates_pods() {
        let patches = build_patches(&[], fixed_time());
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].target, PatchTarget::kind("Deployment"));
        assert_eq!(
            patches[0].operations,
            vec![PatchOperation::add(
                "/spec/template/metadata/annotations/kubectl.kubernetes.io~1recreatedAt",
                "2024-05-01T12:30:00Z",
            )]
        );
    }

    #[test]
    fn test_ports_assigned_sequentially() {
        let locals = vec![local("a", 3000), local("b", 3001), local("c", 3002)];
        let patches = build_patches(&locals, fixed_time());

        assert_eq!(patches.len(), 4);
        assert_eq!(
            patches.iter().filter(|p| p.target.kind == "Deployment").count(),
            1
        );

        for (patch, (name, port)) in patches[1..].iter().zip([("a", 18080), ("b", 18081), ("c", 18082)]) {
            assert_eq!(patch.target, PatchTarget::named("Service", name));
            assert_eq!(
                patch.operations,
                vec![
                    PatchOperation::replace("/spec/selector/app", "dev-proxy"),
                    PatchOperation::Replace {
                        path: "/spec/ports/0/targetPort".to_string(),
                        value: json!(port),
                    },
                ]
            );
        }
    }

    #[test]
    fn test_routes_match_service_patches() {
        let locals = vec![local("web", 5173), local("api", 8080)];
        let routes = upstream_routes(&locals);

        assert_eq!(routes[0].service, "web");
        assert_eq!(routes[0].upstream_port, 18080);
        assert_eq!(routes[0].local_port, 5173);
        assert_eq!(routes[1].service, "api");
        assert_eq!(routes[1].upstream_port, 18081);
        assert_eq!(routes[1].health_check_path, "/healthz");

        let json = serde_json::to_value(&routes[1]).unwrap();
        assert_eq!(json["upstreamPort"], json!(18081));
        assert!(json.get("fallbackSelector").is_none());
    }

    #[test]
    fn test_route_carries_fallback_selector() {
        let mut api = local("api", 8080);
        api.selector.insert("app".to_string(), "api".to_string());

        let json = serde_json::to_value(&upstream_routes(&[api])[0]).unwrap();
        assert_eq!(json["fallbackSelector"], json!({"app": "api"}));
    }
}

//! `dx uninstall [SERVICES...] [--all]`
//!
//! After the services are gone, the dev-proxy is removed too once it is the
//! only dx-managed release left.

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use super::{finish, proxy, run_parallel, App};
use crate::ui;

pub async fn execute(app: &App, names: Vec<String>, all: bool) -> Result<()> {
    let services = app.select_services(&names, all)?;

    ui::print_header(&format!("Uninstalling from context {}", app.context.name));

    let outcomes = run_parallel(app, services, |deploy, service| deploy.uninstall(&service.name)).await;
    let result = finish("uninstall", &outcomes);

    match (result, remove_idle_proxy(app).await) {
        (Err(e), Err(proxy_err)) => {
            warn!("Skipped dev-proxy cleanup: {:#}", proxy_err);
            Err(e)
        }
        (result, proxy) => result.and(proxy),
    }
}

async fn remove_idle_proxy(app: &App) -> Result<()> {
    let Some(ref dev_proxy) = app.context.dev_proxy else {
        return Ok(());
    };

    let deploy = Arc::clone(&app.deploy);
    let (releases, in_use) = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok((deploy.deployed_releases()?, deploy.has_deployed_services()?))
    })
    .await??;

    if in_use || !releases.contains(&dev_proxy.name) {
        return Ok(());
    }

    ui::print_info("No dx services left, removing dev-proxy");
    proxy::uninstall(app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::app_with;
    use crate::testing::FakeHelm;

    fn helm_with_releases(releases: &[&str]) -> FakeHelm {
        let mut helm = FakeHelm::rendering("");
        helm.releases = releases.iter().map(|s| s.to_string()).collect();
        helm
    }

    #[tokio::test]
    async fn test_last_service_removes_proxy() {
        let t = app_with(helm_with_releases(&["dev-proxy"]));

        execute(&t.app, vec!["api".to_string()], false).await.unwrap();

        let uninstalls: Vec<String> = t
            .helm
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("uninstall"))
            .collect();
        assert_eq!(uninstalls, vec!["uninstall api shop", "uninstall dev-proxy shop"]);
    }

    #[tokio::test]
    async fn test_proxy_kept_while_services_remain() {
        let t = app_with(helm_with_releases(&["dev-proxy", "web"]));

        execute(&t.app, vec!["api".to_string()], false).await.unwrap();

        assert!(!t.helm.calls().contains(&"uninstall dev-proxy shop".to_string()));
    }

    #[tokio::test]
    async fn test_proxy_already_gone() {
        let t = app_with(helm_with_releases(&[]));

        execute(&t.app, vec!["api".to_string()], true).await.unwrap();

        assert!(!t.helm.calls().contains(&"uninstall dev-proxy shop".to_string()));
    }

    #[tokio::test]
    async fn test_failed_uninstall_fails_command() {
        let mut helm = helm_with_releases(&["dev-proxy", "api"]);
        helm.uninstall_error = Some("Error: timed out waiting for the condition".to_string());
        let t = app_with(helm);

        let err = execute(&t.app, vec!["api".to_string()], false).await.unwrap_err();
        assert!(err.to_string().contains("1 of 1"));
    }

    #[tokio::test]
    async fn test_service_failure_outranks_proxy_lookup_failure() {
        let mut helm = helm_with_releases(&[]);
        helm.uninstall_error = Some("Error: timed out waiting for the condition".to_string());
        helm.list_error = Some("Error: Kubernetes cluster unreachable".to_string());
        let t = app_with(helm);

        let err = execute(&t.app, vec!["api".to_string()], false).await.unwrap_err();
        assert!(err.to_string().contains("1 of 1"));
    }

    #[tokio::test]
    async fn test_proxy_lookup_failure_alone_fails_command() {
        let mut helm = helm_with_releases(&[]);
        helm.list_error = Some("Error: Kubernetes cluster unreachable".to_string());
        let t = app_with(helm);

        let err = execute(&t.app, vec!["api".to_string()], false).await.unwrap_err();
        assert!(format!("{:#}", err).contains("cluster unreachable"));
    }
}

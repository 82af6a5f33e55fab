//! `dx proxy install|uninstall`

use anyhow::Result;
use tracing::info;

use super::{run_parallel, App, ServiceOutcome};
use crate::config::ServiceConfig;
use crate::error::DeployError;
use crate::services::DeployService;
use crate::ui;

async fn run_on_proxy<F>(app: &App, action: &str, op: F) -> Result<()>
where
    F: Fn(&DeployService, &ServiceConfig) -> Result<(), DeployError> + Send + Sync + 'static,
{
    let proxy = app.dev_proxy()?.clone();
    let outcomes = run_parallel(app, vec![proxy], op).await;

    match outcomes.into_iter().next() {
        Some(ServiceOutcome {
            service,
            error: Some(error),
            ..
        }) => anyhow::bail!("Failed to {} {}: {}", action, service, error),
        _ => Ok(()),
    }
}

/// Install or upgrade the dev-proxy release
pub async fn install(app: &App) -> Result<()> {
    run_on_proxy(app, "install", |deploy, proxy| deploy.install_dev_proxy(proxy)).await?;
    info!("dev-proxy is up to date in context {}", app.context.name);
    Ok(())
}

pub async fn uninstall(app: &App) -> Result<()> {
    run_on_proxy(app, "uninstall", |deploy, proxy| deploy.uninstall(&proxy.name)).await
}

pub async fn execute_install(app: &App) -> Result<()> {
    ui::print_header("Installing dev-proxy");
    install(app).await?;
    ui::print_success("dev-proxy installed");
    Ok(())
}

pub async fn execute_uninstall(app: &App) -> Result<()> {
    ui::print_header("Uninstalling dev-proxy");
    uninstall(app).await?;
    ui::print_success("dev-proxy uninstalled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{app, app_with};
    use crate::testing::FakeHelm;

    #[tokio::test]
    async fn test_install_proxy_skips_patching() {
        let t = app();
        install(&t.app).await.unwrap();

        assert_eq!(
            t.helm.calls(),
            vec![
                "template dev-proxy /src/charts/dev-proxy shop".to_string(),
                "upgrade dev-proxy shop /state/dev/charts/dev-proxy".to_string(),
            ]
        );
        // only the lock was touched, and it is gone again
        assert!(t.fs.paths().is_empty());
    }

    #[tokio::test]
    async fn test_uninstall_failure_is_reported() {
        let mut helm = FakeHelm::rendering("");
        helm.uninstall_error = Some("Error: release: not found".to_string());
        let t = app_with(helm);

        let err = uninstall(&t.app).await.unwrap_err();
        assert!(err.to_string().contains("release: not found"));
    }

    #[tokio::test]
    async fn test_missing_proxy_config() {
        let mut t = app();
        t.app.context.dev_proxy = None;

        let err = install(&t.app).await.unwrap_err();
        assert!(err.to_string().contains("no devProxy"));
        assert!(t.helm.calls().is_empty());
    }
}

//! `dx render <SERVICE> [--output FILE]`
//!
//! Prints the manifests exactly as `install` would hand them to Helm.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::{with_lock, App};
use crate::services::RenderedService;
use crate::ui;

pub async fn execute(app: &App, name: String, output: Option<PathBuf>) -> Result<()> {
    let rendered = render(app, name).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered.manifests)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ui::print_success(&format!(
                "Rendered manifests for namespace '{}' written to {}",
                rendered.namespace,
                path.display()
            ));
        }
        None => print!("{}", rendered.manifests),
    }

    Ok(())
}

async fn render(app: &App, name: String) -> Result<RenderedService> {
    let service = app
        .select_services(&[name], false)?
        .into_iter()
        .next()
        .context("No service selected")?;

    let deploy = Arc::clone(&app.deploy);
    let fs = Arc::clone(&app.fs);
    let lock = app.lock_path(&service.name);

    tokio::task::spawn_blocking(move || {
        with_lock(fs.as_ref(), &lock, || Ok(deploy.render(&service)?))
    })
    .await?
    .context("Failed to render manifests")
}

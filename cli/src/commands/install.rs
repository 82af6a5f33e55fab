//! `dx install [SERVICES...] [--all]`

use anyhow::Result;

use super::{finish, proxy, run_parallel, App};
use crate::ui;

pub async fn execute(app: &App, names: Vec<String>, all: bool) -> Result<()> {
    let services = app.select_services(&names, all)?;

    ui::print_header(&format!("Installing into context {}", app.context.name));

    // Routing patches point Services at the dev-proxy, so it goes first
    if !app.context.local_services.is_empty() {
        if app.context.dev_proxy.is_some() {
            ui::print_info("Installing dev-proxy");
            proxy::install(app).await?;
        } else {
            ui::print_warning("Local services are configured but no devProxy is; redirected traffic has nowhere to go");
        }
    }

    let outcomes = run_parallel(app, services, |deploy, service| deploy.install(service)).await;
    finish("install", &outcomes)
}

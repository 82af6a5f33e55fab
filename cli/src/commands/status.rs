//! `dx status [--format text|json]`
//!
//! Shows the active context, the dx-managed releases in the current
//! namespace and the dev-proxy routing table.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::App;
use crate::domain::{upstream_routes, UpstreamRoute};
use crate::ui;

/// Output format for status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub context: String,
    pub state_dir: PathBuf,
    pub releases: Vec<String>,
    pub has_deployed_services: bool,
    pub routes: Vec<UpstreamRoute>,
}

pub async fn execute(app: &App, format: OutputFormat) -> Result<()> {
    let report = collect(app).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_status(&report),
    }

    Ok(())
}

async fn collect(app: &App) -> Result<StatusReport> {
    let deploy = Arc::clone(&app.deploy);
    let (releases, has_deployed_services) = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok((deploy.deployed_releases()?, deploy.has_deployed_services()?))
    })
    .await??;

    Ok(StatusReport {
        context: app.context.name.clone(),
        state_dir: app.state_dir.clone(),
        releases,
        has_deployed_services,
        routes: upstream_routes(&app.context.local_services),
    })
}

fn print_text_status(report: &StatusReport) {
    ui::print_header(&format!("dx status: {}", report.context));

    println!("{} {}", "State directory:".bold(), report.state_dir.display());
    println!();

    println!("{}", "Releases".bright_white().bold());
    if report.releases.is_empty() {
        ui::print_info("No dx-managed releases in this namespace");
    } else {
        for release in &report.releases {
            println!("  • {}", release);
        }
    }
    println!();

    println!("{}", "Routes".bright_white().bold());
    ui::print_routes(&report.routes);
}

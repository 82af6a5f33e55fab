use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod tools;
mod ui;

#[cfg(test)]
mod testing;

use cli::{Cli, Commands, ProxyCommands};
use commands::{install, proxy, render, status, uninstall, App};
use config::{ConfigRepository, DxConfig, FileConfigRepository};
use infrastructure::{
    CommandRunner, FileSystem, FsChartWrapper, HelmCli, KubeconfigNamespace, PatchEngine, PlaceholderTemplater,
    SandboxedFs, SystemRunner,
};
use services::DeployService;

/// Load the config and wire the real adapters together
fn build_app(config_flag: Option<PathBuf>) -> Result<App> {
    let config_path = config::config_path(config_flag);
    let dx_config =
        DxConfig::load(&config_path).with_context(|| format!("Failed to load {}", config_path.display()))?;

    let state_dir = dx_config.resolve_state_dir();
    let state_dir = if state_dir.is_absolute() {
        state_dir
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(state_dir)
    };

    let repository = FileConfigRepository::new(dx_config);
    let context = repository.current_context()?;

    let sandbox = SandboxedFs::new(state_dir);
    let state_dir = sandbox.root().to_path_buf();
    debug!("State directory: {}", state_dir.display());
    let fs: Arc<dyn FileSystem> = Arc::new(sandbox);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    let deploy = DeployService::new(
        Arc::new(repository),
        Arc::new(HelmCli::new(Arc::clone(&runner))),
        PatchEngine::new(Arc::clone(&fs), Arc::clone(&runner)),
        Arc::new(FsChartWrapper::new(Arc::clone(&fs), &state_dir)),
        Arc::new(PlaceholderTemplater::new()?),
        Arc::new(KubeconfigNamespace),
        &state_dir,
    );

    Ok(App {
        context,
        deploy: Arc::new(deploy),
        fs,
        state_dir,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    let app = build_app(cli.config)?;

    match cli.command {
        Commands::Install { services, all } => {
            install::execute(&app, services, all).await?;
        }
        Commands::Uninstall { services, all } => {
            uninstall::execute(&app, services, all).await?;
        }
        Commands::Proxy { command } => match command {
            ProxyCommands::Install => proxy::execute_install(&app).await?,
            ProxyCommands::Uninstall => proxy::execute_uninstall(&app).await?,
        },
        Commands::Render { service, output } => {
            render::execute(&app, service, output).await?;
        }
        Commands::Status { format } => {
            status::execute(&app, format).await?;
        }
    }

    Ok(())
}

//! CLI definitions for dx
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::status::OutputFormat;

#[derive(Parser)]
#[command(
    name = "dx",
    version,
    about = "Run one service locally while the rest of the app runs in Kubernetes",
    long_about = "Installs Helm charts with their Services rerouted through an in-cluster dev-proxy,\nso traffic for locally overridden services reaches the developer machine."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./dx.yaml)
    #[arg(short, long, global = true, env = "DX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install or upgrade services with traffic routing patches
    Install {
        /// Services to install
        services: Vec<String>,

        /// Install every service of the current context
        #[arg(long, conflicts_with = "services")]
        all: bool,
    },

    /// Uninstall services (and the dev-proxy once nothing else is left)
    Uninstall {
        /// Services to uninstall
        services: Vec<String>,

        /// Uninstall every service of the current context
        #[arg(long, conflicts_with = "services")]
        all: bool,
    },

    /// Manage the in-cluster dev-proxy
    Proxy {
        #[command(subcommand)]
        command: ProxyCommands,
    },

    /// Print the patched manifests of a service without installing them
    Render {
        /// Service to render
        service: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show dx-managed releases and the dev-proxy routing table
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Dev-proxy subcommands
#[derive(Subcommand)]
pub enum ProxyCommands {
    /// Install or upgrade the dev-proxy
    Install,

    /// Uninstall the dev-proxy
    Uninstall,
}

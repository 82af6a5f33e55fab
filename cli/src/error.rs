//! Centralized error types for dx
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a single service pipeline
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Security check failed: {0}")]
    Security(#[from] SecurityError),

    #[error("Helm error: {0}")]
    Helm(#[from] HelmError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Wrapper chart error: {0}")]
    Wrapper(#[from] WrapperError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Helm argument templating errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("{template}: no value for key '{key}'")]
    MissingKey { template: String, key: String },

    #[error("Invalid placeholder pattern: {message}")]
    Pattern { message: String },
}

/// Rejected pass-through arguments
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Helm argument '{argument}' uses blocked flag {flag}")]
    BlockedFlag { flag: &'static str, argument: String },
}

/// Process execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Helm invocation errors, each carrying the tool's combined output
#[derive(Error, Debug)]
pub enum HelmError {
    #[error("helm template failed for {release}:\n{output}")]
    Template { release: String, output: String },

    #[error("helm upgrade failed for {release}:\n{output}")]
    Upgrade { release: String, output: String },

    #[error("helm uninstall failed for {release}:\n{output}")]
    Uninstall { release: String, output: String },

    #[error("helm list failed:\n{output}")]
    List { output: String },

    #[error("Could not parse helm list output: {message}")]
    ParseList { message: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Manifest patching errors
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Failed to create work directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },

    #[error("Invalid add operation at '{path}': {reason}")]
    InvalidOperation { path: String, reason: String },

    #[error("kubectl kustomize failed:\n{output}")]
    MergeFailed { output: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Wrapper chart generation errors
#[derive(Error, Debug)]
pub enum WrapperError {
    #[error("Failed to create chart directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize Chart.yaml: {message}")]
    Serialize { message: String },

    #[error("Failed to remove {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration:\n  {}", .problems.join("\n  "))]
    Invalid { problems: Vec<String> },

    #[error("Context '{name}' is not defined")]
    UnknownContext { name: String },

    #[error("Service '{name}' is not defined in context '{context}'")]
    UnknownService { name: String, context: String },
}

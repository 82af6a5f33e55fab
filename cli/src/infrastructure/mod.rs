//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Process execution (helm, kubectl)
//! - The sandboxed state directory
//! - Helm releases
//! - kubectl kustomize (patch engine)
//! - Wrapper chart generation
//! - kubeconfig namespace lookup
//! - Helm argument templating

pub mod fs;
pub mod helm;
pub mod kubeconfig;
pub mod kustomize;
pub mod process;
pub mod templater;
pub mod wrapper_chart;

// Re-export commonly used types
pub use fs::{FileSystem, SandboxedFs};
pub use helm::{HelmCli, HelmClient};
pub use kubeconfig::{KubeconfigNamespace, NamespaceResolver};
pub use kustomize::PatchEngine;
pub use process::{CommandRunner, SystemRunner};
pub use templater::{PlaceholderTemplater, Templater};
pub use wrapper_chart::{ChartWrapper, FsChartWrapper, WrapperChartConfig};

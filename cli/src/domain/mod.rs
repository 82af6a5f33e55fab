//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod kustomization;
pub mod patch;
pub mod routing;
pub mod security;

// Re-export commonly used types
pub use patch::Patch;
pub use routing::{build_patches, upstream_routes, UpstreamRoute};
pub use security::validate_helm_args;

/// Label stamped on every resource and release dx manages
pub const MANAGED_BY_LABEL: &str = "managed-by";
pub const MANAGED_BY_VALUE: &str = "dx";

/// `managed-by=dx`, as a Helm label / selector argument
pub fn managed_by_selector() -> String {
    format!("{}={}", MANAGED_BY_LABEL, MANAGED_BY_VALUE)
}

//! Runtime tool path resolution
//!
//! For each external tool (e.g. `helm`), we:
//! 1. Check for an environment variable `{TOOL}_BIN` (e.g. `HELM_BIN`)
//! 2. Look the tool up on PATH
//! 3. Fall back to the bare tool name and let process spawning report the failure
//!
//! The envvar override keeps pinned tool versions reproducible and makes the
//! tools easy to swap out in tests.

use std::env;
use std::path::PathBuf;

/// Tool names invoked by dx
pub mod tools {
    pub const HELM: &str = "helm";
    pub const KUBECTL: &str = "kubectl";
}

/// Environment variable consulted for a tool override (`helm` -> `HELM_BIN`)
fn override_var(tool: &str) -> String {
    format!("{}_BIN", tool.to_uppercase().replace('-', "_"))
}

/// Get the path to an external tool
///
/// Returns the value of `{TOOL}_BIN` when set and non-empty, otherwise the
/// PATH lookup result, otherwise the tool name itself.
pub fn get_tool_path(tool: &str) -> PathBuf {
    if let Ok(path) = env::var(override_var(tool)) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    which::which(tool).unwrap_or_else(|_| PathBuf::from(tool))
}

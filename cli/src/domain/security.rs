//! Helm argument validation
//!
//! Helm args come from user configuration and may interpolate secrets, so
//! they are untrusted relative to dx itself. Flags that could swap the
//! renderer, the cluster credentials, or the registry credentials are refused.

use crate::error::SecurityError;

pub const BLOCKED_HELM_FLAGS: &[&str] = &[
    "--post-renderer",
    "--kubeconfig",
    "--kube-context",
    "--repository-config",
    "--registry-config",
    "--ca-file",
    "--cert-file",
    "--key-file",
    "--insecure-skip-tls-verify",
    "--password",
    "--username",
    "--kube-token",
    "--kube-as",
    "--kube-as-group",
    "--kube-as-uid",
    "--kube-ca-file",
    "--kube-apiserver",
];

/// Return the blocked flag an argument uses, if any.
/// Matching is case-insensitive, on the exact flag or `flag=...`.
pub fn blocked_flag(argument: &str) -> Option<&'static str> {
    let lowered = argument.to_ascii_lowercase();
    BLOCKED_HELM_FLAGS.iter().copied().find(|flag| {
        lowered
            .strip_prefix(flag)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
    })
}

/// Reject the whole argument list on the first blocked flag
pub fn validate_helm_args(args: &[String]) -> Result<(), SecurityError> {
    for argument in args {
        if let Some(flag) = blocked_flag(argument) {
            return Err(SecurityError::BlockedFlag {
                flag,
                argument: argument.clone(),
            });
        }
    }
    Ok(())
}

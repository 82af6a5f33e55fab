//! Parallel per-service execution
//!
//! Each service runs on its own blocking task while holding
//! `<stateDir>/<context>/locks/<service>.lock`. A failing service never
//! cancels its siblings; outcomes are collected after all tasks finish.

use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::App;
use crate::config::ServiceConfig;
use crate::error::DeployError;
use crate::infrastructure::FileSystem;
use crate::services::DeployService;
use crate::ui;

#[derive(Debug)]
pub struct ServiceOutcome {
    pub service: String,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ServiceOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Run `f` while holding an exclusive lock file. The lock is removed when
/// `f` returns, including on panic.
pub fn with_lock<T>(fs: &dyn FileSystem, lock: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(dir) = lock.parent() {
        fs.mkdir_all(dir)
            .with_context(|| format!("Failed to create lock directory {}", dir.display()))?;
    }

    match fs.create_new(lock) {
        Ok(()) => debug!("Acquired {}", lock.display()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            anyhow::bail!(
                "Another dx process is working on this service (lock {}; remove it if stale)",
                lock.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to create lock {}", lock.display()));
        }
    }

    let _guard = scopeguard::guard((), |_| {
        if let Err(e) = fs.remove_file(lock) {
            warn!("Failed to release lock {}: {}", lock.display(), e);
        }
    });

    f()
}

/// Run `op` for every service in parallel and collect the outcomes in
/// input order
pub async fn run_parallel<F>(app: &App, services: Vec<ServiceConfig>, op: F) -> Vec<ServiceOutcome>
where
    F: Fn(&DeployService, &ServiceConfig) -> Result<(), DeployError> + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let mut handles = Vec::with_capacity(services.len());

    for service in services {
        let op = Arc::clone(&op);
        let deploy = Arc::clone(&app.deploy);
        let fs = Arc::clone(&app.fs);
        let lock = app.lock_path(&service.name);
        let name = service.name.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let result = with_lock(fs.as_ref(), &lock, || Ok((*op)(deploy.as_ref(), &service)?));
            (result, started.elapsed())
        });
        handles.push((name, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (service, handle) in handles {
        let outcome = match handle.await {
            Ok((Ok(()), elapsed)) => ServiceOutcome {
                service,
                error: None,
                elapsed,
            },
            Ok((Err(e), elapsed)) => ServiceOutcome {
                service,
                error: Some(format!("{:#}", e)),
                elapsed,
            },
            Err(e) => ServiceOutcome {
                service,
                error: Some(format!("task failed: {}", e)),
                elapsed: Duration::ZERO,
            },
        };
        outcomes.push(outcome);
    }

    outcomes
}

/// Print the results table and fail if any service failed
pub fn finish(action: &str, outcomes: &[ServiceOutcome]) -> Result<()> {
    ui::print_results(outcomes);

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} service(s) failed to {}", failed, outcomes.len(), action);
    }

    ui::print_success(&format!("{} {} service(s)", capitalize(action), outcomes.len()));
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! In-memory doubles for the infrastructure traits, used by unit tests

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::{ConfigRepository, ContextConfig, LocalServiceConfig, ServiceConfig};
use crate::error::{CommandError, ConfigError, HelmError, WrapperError};
use crate::infrastructure::process::{CommandOutput, CommandRunner, Invocation};
use crate::infrastructure::{ChartWrapper, FileSystem, HelmClient, NamespaceResolver, WrapperChartConfig};

#[derive(Default)]
struct MemoryFsState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    failing: BTreeSet<PathBuf>,
    failing_dirs: BTreeSet<PathBuf>,
}

/// Filesystem kept in a map; paths are taken literally
#[derive(Default)]
pub struct MemoryFs {
    state: Mutex<MemoryFsState>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().dirs.iter().cloned().collect()
    }

    pub fn read_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Make every later write to `path` fail
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().failing.insert(path.as_ref().to_path_buf());
    }

    /// Make every later `mkdir_all` of `path` fail
    pub fn fail_mkdir_for(&self, path: impl AsRef<Path>) {
        self.state.lock().unwrap().failing_dirs.insert(path.as_ref().to_path_buf());
    }
}

impl FileSystem for MemoryFs {
    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_dirs.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "mkdir refused"));
        }
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write refused"));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    fn create_new(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.files.contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, path.display().to_string()));
        }
        state.files.insert(path.to_path_buf(), Vec::new());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        match self.state.lock().unwrap().files.remove(path) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string())),
        }
    }
}

/// Records invocations and answers with canned output.
///
/// Responses match on the rendered command line prefix; the most recently
/// registered match wins. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    responses: Mutex<Vec<(String, CommandOutput)>>,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        self.responses.lock().unwrap().push((prefix.to_string(), output));
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let line = invocation.to_string();
        let output = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""));

        Ok(output)
    }
}

/// Helm double recording one line per call:
/// `template <name> <chart> <ns> <args..>`, `upgrade <name> <ns> <chart>`,
/// `uninstall <name> <ns>`, `list <selector> <ns>`
#[derive(Default)]
pub struct FakeHelm {
    pub template_output: String,
    pub template_error: Option<String>,
    pub upgrade_error: Option<String>,
    pub uninstall_error: Option<String>,
    pub list_error: Option<String>,
    pub releases: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeHelm {
    pub fn rendering(manifests: &str) -> Self {
        Self {
            template_output: manifests.to_string(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, parts: Vec<String>) {
        self.calls.lock().unwrap().push(parts.join(" "));
    }
}

impl HelmClient for FakeHelm {
    fn template(&self, name: &str, chart_path: &Path, namespace: &str, args: &[String]) -> Result<String, HelmError> {
        let mut parts = vec![
            "template".to_string(),
            name.to_string(),
            chart_path.display().to_string(),
            namespace.to_string(),
        ];
        parts.extend(args.iter().cloned());
        self.record(parts);

        match &self.template_error {
            Some(output) => Err(HelmError::Template {
                release: name.to_string(),
                output: output.clone(),
            }),
            None => Ok(self.template_output.clone()),
        }
    }

    fn upgrade_from_manifests(&self, name: &str, namespace: &str, chart_path: &Path) -> Result<(), HelmError> {
        self.record(vec![
            "upgrade".to_string(),
            name.to_string(),
            namespace.to_string(),
            chart_path.display().to_string(),
        ]);

        match &self.upgrade_error {
            Some(output) => Err(HelmError::Upgrade {
                release: name.to_string(),
                output: output.clone(),
            }),
            None => Ok(()),
        }
    }

    fn uninstall(&self, name: &str, namespace: &str) -> Result<(), HelmError> {
        self.record(vec!["uninstall".to_string(), name.to_string(), namespace.to_string()]);

        match &self.uninstall_error {
            Some(output) => Err(HelmError::Uninstall {
                release: name.to_string(),
                output: output.clone(),
            }),
            None => Ok(()),
        }
    }

    fn list(&self, selector: &str, namespace: &str) -> Result<Vec<String>, HelmError> {
        self.record(vec!["list".to_string(), selector.to_string(), namespace.to_string()]);

        match &self.list_error {
            Some(output) => Err(HelmError::List {
                output: output.clone(),
            }),
            None => Ok(self.releases.clone()),
        }
    }
}

/// Chart wrapper double; charts "live" at `/state/<context>/charts/<release>`
#[derive(Default)]
pub struct FakeWrapper {
    pub fail_generate: bool,
    pub fail_cleanup: bool,
    generated: Mutex<Vec<WrapperChartConfig>>,
    cleaned: Mutex<Vec<(String, String)>>,
}

impl FakeWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generated(&self) -> Vec<WrapperChartConfig> {
        self.generated.lock().unwrap().clone()
    }

    pub fn cleaned(&self) -> Vec<(String, String)> {
        self.cleaned.lock().unwrap().clone()
    }
}

impl ChartWrapper for FakeWrapper {
    fn generate(&self, config: &WrapperChartConfig) -> Result<PathBuf, WrapperError> {
        self.generated.lock().unwrap().push(config.clone());
        let chart_dir = PathBuf::from("/state")
            .join(&config.context_name)
            .join("charts")
            .join(&config.release_name);

        if self.fail_generate {
            return Err(WrapperError::WriteFile {
                path: chart_dir.join("Chart.yaml"),
                source: io::Error::new(io::ErrorKind::StorageFull, "disk full"),
            });
        }
        Ok(chart_dir)
    }

    fn cleanup(&self, context_name: &str, service_name: &str) -> Result<(), WrapperError> {
        self.cleaned
            .lock()
            .unwrap()
            .push((context_name.to_string(), service_name.to_string()));

        if self.fail_cleanup {
            return Err(WrapperError::Cleanup {
                path: PathBuf::from("/state").join(context_name).join("charts").join(service_name),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        Ok(())
    }
}

/// Fixed configuration; `None` behaves like an unresolvable current context
pub struct StaticConfig(pub Option<ContextConfig>);

impl StaticConfig {
    /// Context `dev` with service `api` overridden locally on port 8080
    pub fn sample() -> Self {
        let mut values = BTreeMap::new();
        values.insert("registry".to_string(), serde_json::Value::from("ghcr.io/acme"));

        Self(Some(ContextConfig {
            name: "dev".to_string(),
            services: vec![Self::sample_service("api"), Self::sample_service("web")],
            local_services: vec![LocalServiceConfig {
                name: "api".to_string(),
                local_port: 8080,
                kubernetes_port: 80,
                health_check_path: "/healthz".to_string(),
                selector: BTreeMap::new(),
            }],
            dev_proxy: Some(Self::sample_service("dev-proxy")),
            values,
        }))
    }

    pub fn broken() -> Self {
        Self(None)
    }

    /// A service whose chart lives at `/src/charts/<name>`
    pub fn sample_service(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            helm_path: PathBuf::from("/src/charts"),
            helm_chart_relative_path: name.to_string(),
            helm_args: Vec::new(),
        }
    }
}

impl ConfigRepository for StaticConfig {
    fn current_context(&self) -> Result<ContextConfig, ConfigError> {
        self.0.clone().ok_or_else(|| ConfigError::UnknownContext {
            name: "missing".to_string(),
        })
    }
}

pub struct FixedNamespace(pub String);

impl NamespaceResolver for FixedNamespace {
    fn current_namespace(&self) -> String {
        self.0.clone()
    }
}

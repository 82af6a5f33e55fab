//! Sandboxed filesystem access
//!
//! dx only ever writes inside its state directory. `SandboxedFs` enforces
//! that before any disk access happens.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Filesystem operations used by the patch engine, wrapper charts and locks
pub trait FileSystem: Send + Sync {
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Remove a directory tree; a missing path is not an error
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    /// Create an empty file, failing with `AlreadyExists` if it is present
    fn create_new(&self, path: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem restricted to a root directory.
///
/// Relative paths resolve under the root and absolute paths must lie inside
/// it. Below the root, `..` components are always rejected.
#[derive(Debug, Clone)]
pub struct SandboxedFs {
    root: PathBuf,
    /// The root as given, so paths built from an unnormalized root still match
    given: PathBuf,
}

impl SandboxedFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let given = root.into();
        Self {
            root: normalize(&given),
            given,
        }
    }

    /// The root with `.` and `..` components folded away
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root)
                .or_else(|_| path.strip_prefix(&self.given))
                .map_err(|_| outside_sandbox(path))?
        } else {
            path
        };

        if relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(outside_sandbox(path));
        }

        Ok(self.root.join(relative))
    }
}

/// Fold `.` and `..` lexically. A `..` that would climb above the start of
/// a relative path is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn outside_sandbox(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("{} is outside the dx state directory", path.display()),
    )
}

impl FileSystem for SandboxedFs {
    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path)?)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(self.resolve(path)?, contents)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        match fs::remove_dir_all(self.resolve(path)?) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn create_new(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.resolve(path)?)
            .map(|_| ())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?)
    }
}

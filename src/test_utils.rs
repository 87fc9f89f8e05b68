//! Test utilities shared across test modules
//!
//! Tests that touch process environment variables must also be marked
//! `#[serial]` so guards from different tests never interleave.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::env::{EnvContext, Mode};
use crate::paths::Paths;

/// Build an environment context whose home lives inside the temp directory
pub fn setup_test_env(temp_dir: &TempDir, mode: Mode) -> EnvContext {
    EnvContext::with_home(temp_dir.path().join("home"), mode)
}

/// Resolve production-mode paths under the temp directory and create the roots
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    let paths = Paths::resolve(&setup_test_env(temp_dir, Mode::Production));
    paths.ensure_dirs().unwrap();
    paths
}

/// Write `contents` at `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Every file below `root`, as sorted paths relative to it
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// RAII guard that restores an environment variable to its original value on drop
pub struct EnvVarGuard {
    key: String,
    previous: Option<OsString>,
}

impl EnvVarGuard {
    pub fn set(key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let previous = env::var_os(key);
        unsafe { env::set_var(key, value) };
        Self {
            key: key.to_string(),
            previous,
        }
    }

    pub fn unset(key: &str) -> Self {
        let previous = env::var_os(key);
        unsafe { env::remove_var(key) };
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => unsafe { env::set_var(&self.key, value) },
            None => unsafe { env::remove_var(&self.key) },
        }
    }
}

//! Project marker lookup.
//!
//! A directory is a project root when it directly contains the marker
//! directory (`.plandex-v2`, or `.plandex-dev-v2` in development mode).
//! Only the working directory itself is checked; parents are never searched.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::env::Mode;
use crate::git::is_git_repo;

/// Return the marker directory under `dir`, if one exists
pub fn find_marker(dir: &Path, mode: Mode) -> Option<PathBuf> {
    let marker = dir.join(mode.marker_dir_name());
    marker.is_dir().then_some(marker)
}

/// Project state for the current working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub mode: Mode,
    pub cwd: PathBuf,
    /// The marker directory, once found or created
    pub marker_dir: Option<PathBuf>,
    /// Set to `cwd` whenever a marker is present
    pub root: Option<PathBuf>,
}

impl Project {
    /// Look for an existing marker in `cwd`
    pub fn detect(cwd: impl Into<PathBuf>, mode: Mode) -> Self {
        let mut project = Self {
            mode,
            cwd: cwd.into(),
            marker_dir: None,
            root: None,
        };
        project.find();
        project
    }

    /// Re-check the working directory for a marker and update project state
    pub fn find(&mut self) -> Option<&Path> {
        self.marker_dir = find_marker(&self.cwd, self.mode);
        if self.marker_dir.is_some() {
            self.root = Some(self.cwd.clone());
        }
        self.marker_dir.as_deref()
    }

    /// Find the marker, creating it in the working directory if absent.
    ///
    /// Returns the marker path and whether it was created by this call.
    ///
    /// # Errors
    /// Fails if the marker directory cannot be created, e.g. permission denied
    /// or a non-directory already occupying the name.
    pub fn find_or_create(&mut self) -> Result<(PathBuf, bool)> {
        if let Some(existing) = self.find() {
            let existing = existing.to_path_buf();
            return Ok((existing, false));
        }

        let marker = self.cwd.join(self.mode.marker_dir_name());
        fs::create_dir(&marker)
            .with_context(|| format!("Failed to create project directory: {:?}", marker))?;
        debug!(marker = %marker.display(), "created project marker");

        self.marker_dir = Some(marker.clone());
        self.root = Some(self.cwd.clone());
        Ok((marker, true))
    }

    pub fn is_project_root(&self) -> bool {
        self.root.is_some()
    }

    /// Whether the project root is inside a git work tree. False with no root.
    pub fn root_is_git_repo(&self) -> bool {
        self.root.as_deref().is_some_and(is_git_repo)
    }
}

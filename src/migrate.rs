//! One-shot migration from the legacy `~/.plandex-home-v2` layout.
//!
//! The legacy layout is closed, so the set of things worth copying is a
//! fixed list of [`Rule`]s rather than a generic tree copy. Anything in the
//! legacy root that no rule names is left behind.
//!
//! Migration is best-effort. Each copy is an independent step whose outcome
//! is recorded in the [`MigrationReport`]; a failing step never stops its
//! siblings and never surfaces as an error to the caller. Nothing already
//! present in the new layout is overwritten, and the legacy root is only
//! ever read.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fs_utils::{DEFAULT_FILE_MODE, PRIVATE_FILE_MODE, copy_file_no_clobber};
use crate::paths::{
    ACCOUNTS_FILE, AUTH_FILE, CURRENT_PLANS_FILE, PLAN_SETTINGS_FILE, Paths, TIKTOKEN_DIR,
};

/// Legacy subtree holding regenerable caches; never treated as a project
pub const LEGACY_CACHE_DIR: &str = "cache";

/// Which new-layout root a rule writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestRoot {
    Config,
    Cache,
}

/// A file that may appear under more than one legacy name.
///
/// Sources are tried in order; the first that exists is copied to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAlias {
    pub target: &'static str,
    pub sources: &'static [&'static str],
}

/// One entry of the migration manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// A single file directly under the legacy root
    File {
        source: &'static str,
        root: DestRoot,
        target: &'static str,
        mode: u32,
    },
    /// Every non-directory entry directly inside a legacy directory
    FlatDir {
        source: &'static str,
        root: DestRoot,
        target: &'static str,
        mode: u32,
    },
    /// Each top-level legacy directory other than `skip` is a project holding
    /// a plan index, and each of its subdirectories is a plan holding settings
    ProjectTree {
        skip: &'static str,
        index: FileAlias,
        plan_settings: FileAlias,
        mode: u32,
    },
}

/// The complete legacy layout, in the order it is migrated
pub const MANIFEST: &[Rule] = &[
    Rule::File {
        source: "auth.json",
        root: DestRoot::Config,
        target: AUTH_FILE,
        mode: PRIVATE_FILE_MODE,
    },
    Rule::File {
        source: "accounts.json",
        root: DestRoot::Config,
        target: ACCOUNTS_FILE,
        mode: DEFAULT_FILE_MODE,
    },
    Rule::FlatDir {
        source: "cache/tiktoken",
        root: DestRoot::Cache,
        target: TIKTOKEN_DIR,
        mode: DEFAULT_FILE_MODE,
    },
    Rule::ProjectTree {
        skip: LEGACY_CACHE_DIR,
        index: FileAlias {
            target: CURRENT_PLANS_FILE,
            sources: &["current-plans-v2.json", "current-plans.json"],
        },
        plan_settings: FileAlias {
            target: PLAN_SETTINGS_FILE,
            sources: &["settings-v2.json", "settings.json"],
        },
        mode: DEFAULT_FILE_MODE,
    },
];

/// Why migration did or did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy root on disk; nothing was touched
    NoLegacyRoot,
    /// The new config root already holds credentials; nothing was touched
    AlreadyMigrated,
    /// The manifest was applied (individual steps may still have failed)
    Migrated,
}

/// Result of a single copy or directory creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Copied { bytes: u64 },
    CreatedDir,
    SkippedExists,
    SkippedMissing,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: StepStatus,
}

/// Everything a migration run did, step by step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub outcome: MigrationOutcome,
    pub steps: Vec<MigrationStep>,
}

impl MigrationReport {
    fn new(outcome: MigrationOutcome) -> Self {
        Self {
            outcome,
            steps: Vec::new(),
        }
    }

    /// Files copied into the new layout
    pub fn copied(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Copied { .. }))
    }

    /// Steps that hit an I/O error and were skipped
    pub fn failures(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    /// True when the run wrote nothing at all
    pub fn is_noop(&self) -> bool {
        !self
            .steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Copied { .. } | StepStatus::CreatedDir))
    }
}

/// Migrate the legacy root named by `paths` into its config and cache roots
pub fn migrate_paths(paths: &Paths) -> MigrationReport {
    migrate(&paths.legacy_root, &paths.config_root, &paths.cache_root)
}

/// Re-apply the manifest for `paths`, ignoring the credentials check.
///
/// Used to retry steps that failed earlier. Existing destinations are still
/// never overwritten, so anything already migrated is skipped.
pub fn retry_paths(paths: &Paths) -> MigrationReport {
    if !paths.legacy_root.is_dir() {
        return MigrationReport::new(MigrationOutcome::NoLegacyRoot);
    }
    apply_manifest(&paths.legacy_root, &paths.config_root, &paths.cache_root)
}

/// Copy the legacy layout into the new roots, at most once and without overwriting.
///
/// Expects both new roots to exist already.
pub fn migrate(legacy_root: &Path, config_root: &Path, cache_root: &Path) -> MigrationReport {
    if !legacy_root.is_dir() {
        debug!(legacy_root = %legacy_root.display(), "no legacy root, skipping migration");
        return MigrationReport::new(MigrationOutcome::NoLegacyRoot);
    }

    // The credentials file is the sole marker of a completed migration.
    if config_root.join(AUTH_FILE).exists() {
        debug!(
            config_root = %config_root.display(),
            "credentials already present, skipping migration"
        );
        return MigrationReport::new(MigrationOutcome::AlreadyMigrated);
    }

    apply_manifest(legacy_root, config_root, cache_root)
}

fn apply_manifest(legacy_root: &Path, config_root: &Path, cache_root: &Path) -> MigrationReport {
    let mut run = Run {
        legacy_root,
        config_root,
        cache_root,
        report: MigrationReport::new(MigrationOutcome::Migrated),
    };
    for rule in MANIFEST {
        run.apply(rule);
    }

    let report = run.report;
    info!(
        legacy_root = %legacy_root.display(),
        copied = report.copied().count(),
        failed = report.failures().count(),
        "legacy migration finished"
    );
    report
}

struct Run<'a> {
    legacy_root: &'a Path,
    config_root: &'a Path,
    cache_root: &'a Path,
    report: MigrationReport,
}

impl Run<'_> {
    fn dest_root(&self, root: DestRoot) -> &Path {
        match root {
            DestRoot::Config => self.config_root,
            DestRoot::Cache => self.cache_root,
        }
    }

    fn apply(&mut self, rule: &Rule) {
        match *rule {
            Rule::File {
                source,
                root,
                target,
                mode,
            } => {
                let src = self.legacy_root.join(source);
                let dst = self.dest_root(root).join(target);
                self.copy(src, dst, mode);
            }
            Rule::FlatDir {
                source,
                root,
                target,
                mode,
            } => {
                let src = self.legacy_root.join(source);
                let dst = self.dest_root(root).join(target);
                self.copy_flat_dir(&src, &dst, mode);
            }
            Rule::ProjectTree {
                skip,
                index,
                plan_settings,
                mode,
            } => self.copy_project_tree(skip, index, plan_settings, mode),
        }
    }

    fn copy_flat_dir(&mut self, src: &Path, dst: &Path, mode: u32) {
        let entries = match fs::read_dir(src) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                self.record(src, dst, StepStatus::Failed(e.to_string()));
                return;
            }
        };

        if !self.mkdir(src, dst) {
            return;
        }

        for entry in entries.flatten() {
            // Flat copy only: nested directories are not part of the cache format.
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let name = entry.file_name();
            self.copy(entry.path(), dst.join(&name), mode);
        }
    }

    fn copy_project_tree(
        &mut self,
        skip: &str,
        index: FileAlias,
        plan_settings: FileAlias,
        mode: u32,
    ) {
        for (project_src, name) in subdirectories(self.legacy_root) {
            if name == skip {
                continue;
            }
            let project_dst = self.config_root.join(&name);
            if !self.mkdir(&project_src, &project_dst) {
                continue;
            }
            self.copy_alias(&project_src, &project_dst, index, mode);

            for (plan_src, plan_name) in subdirectories(&project_src) {
                let plan_dst = project_dst.join(&plan_name);
                if !self.mkdir(&plan_src, &plan_dst) {
                    continue;
                }
                self.copy_alias(&plan_src, &plan_dst, plan_settings, mode);
            }
        }
    }

    fn copy_alias(&mut self, src_dir: &Path, dst_dir: &Path, alias: FileAlias, mode: u32) {
        let dst = dst_dir.join(alias.target);
        let src = alias
            .sources
            .iter()
            .map(|name| src_dir.join(name))
            .find(|path| path.exists())
            .unwrap_or_else(|| {
                src_dir.join(alias.sources.first().copied().unwrap_or(alias.target))
            });
        self.copy(src, dst, mode);
    }

    /// Returns whether `dst` is usable as a directory afterwards
    fn mkdir(&mut self, src: &Path, dst: &Path) -> bool {
        if dst.is_dir() {
            return true;
        }
        match fs::create_dir_all(dst) {
            Ok(()) => {
                self.record(src, dst, StepStatus::CreatedDir);
                true
            }
            Err(e) => {
                self.record(src, dst, StepStatus::Failed(e.to_string()));
                false
            }
        }
    }

    fn copy(&mut self, src: PathBuf, dst: PathBuf, mode: u32) {
        let status = if fs::symlink_metadata(&dst).is_ok() {
            StepStatus::SkippedExists
        } else if !src.exists() {
            StepStatus::SkippedMissing
        } else {
            match copy_file_no_clobber(&src, &dst, mode) {
                Ok(bytes) => StepStatus::Copied { bytes },
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => StepStatus::SkippedExists,
                Err(e) => StepStatus::Failed(e.to_string()),
            }
        };
        self.record(&src, &dst, status);
    }

    fn record(&mut self, src: &Path, dst: &Path, status: StepStatus) {
        match &status {
            StepStatus::Failed(reason) => warn!(
                source = %src.display(),
                destination = %dst.display(),
                %reason,
                "migration step failed, skipping"
            ),
            other => debug!(
                source = %src.display(),
                destination = %dst.display(),
                status = ?other,
                "migration step"
            ),
        }
        self.report.steps.push(MigrationStep {
            source: src.to_path_buf(),
            destination: dst.to_path_buf(),
            status,
        });
    }
}

/// Real directories directly under `dir`, sorted by name. Symlinks are not followed.
fn subdirectories(dir: &Path) -> Vec<(PathBuf, OsString)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<_> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| (entry.path(), entry.file_name()))
        .collect();
    dirs.sort_by(|a, b| a.1.cmp(&b.1));
    dirs
}

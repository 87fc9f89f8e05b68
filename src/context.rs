//! Startup sequence.
//!
//! Resolves every directory once and hands the result to the rest of the
//! program as a plain value. Order matters: roots are created before
//! migration runs, and migration finishes before anything reads the new
//! layout.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::env::EnvContext;
use crate::migrate::{MigrationReport, migrate_paths};
use crate::paths::Paths;
use crate::project::Project;

/// Resolved process-wide state, read-only after [`AppContext::init`]
#[derive(Debug, Clone)]
pub struct AppContext {
    pub paths: Paths,
    pub project: Project,
    /// What the startup migration did
    pub migration: MigrationReport,
}

impl AppContext {
    /// Run the startup sequence against the real process environment.
    pub fn from_process() -> Result<Self> {
        let cwd = std::env::current_dir().context("Error getting current working directory")?;
        let env = EnvContext::from_env()?;
        Self::init(&env, cwd)
    }

    /// Run the startup sequence for an explicit environment and working directory.
    ///
    /// # Errors
    /// Fails only if the config or cache roots cannot be created. Migration
    /// problems are reported in [`AppContext::migration`], never here.
    pub fn init(env: &EnvContext, cwd: impl Into<PathBuf>) -> Result<Self> {
        let paths = Paths::resolve(env);
        debug!(
            mode = ?paths.mode,
            config_root = %paths.config_root.display(),
            cache_root = %paths.cache_root.display(),
            "resolved plandex roots"
        );

        paths.ensure_dirs()?;
        let migration = migrate_paths(&paths);
        paths.export_tokenizer_cache_env();

        let project = Project::detect(cwd, paths.mode);

        Ok(Self {
            paths,
            project,
            migration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Mode;
    use crate::migrate::MigrationOutcome;
    use crate::test_utils::{setup_test_env, write_file};
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_init_creates_roots_and_migrates() {
        let temp = TempDir::new().unwrap();
        let env = setup_test_env(&temp, Mode::Production);
        write_file(&env.home.join(".plandex-home-v2"), "auth.json", "token");
        let cwd = temp.path().join("work");
        fs::create_dir_all(&cwd).unwrap();

        let ctx = AppContext::init(&env, &cwd).unwrap();
        assert!(ctx.paths.config_root.is_dir());
        assert!(ctx.paths.tiktoken_dir.is_dir());
        assert_eq!(ctx.migration.outcome, MigrationOutcome::Migrated);
        assert_eq!(fs::read_to_string(&ctx.paths.auth_file).unwrap(), "token");
        assert!(!ctx.project.is_project_root());
        assert_eq!(
            std::env::var_os(crate::env::TOKENIZER_CACHE_VAR).map(PathBuf::from),
            Some(ctx.paths.cache_root.clone())
        );

        let again = AppContext::init(&env, &cwd).unwrap();
        assert_eq!(again.migration.outcome, MigrationOutcome::AlreadyMigrated);
    }

    #[test]
    #[serial]
    fn test_init_detects_project_root() {
        let temp = TempDir::new().unwrap();
        let env = setup_test_env(&temp, Mode::Development);
        let cwd = temp.path().join("work");
        fs::create_dir_all(cwd.join(".plandex-dev-v2")).unwrap();

        let ctx = AppContext::init(&env, &cwd).unwrap();
        assert_eq!(ctx.migration.outcome, MigrationOutcome::NoLegacyRoot);
        assert_eq!(ctx.project.root.as_deref(), Some(cwd.as_path()));
        assert!(ctx.paths.config_root.ends_with("plandex/dev-v2"));
    }

    #[test]
    #[serial]
    fn test_init_fails_when_root_cannot_be_created() {
        let temp = TempDir::new().unwrap();
        let env = EnvContext {
            xdg_config_home: Some(temp.path().join("blocked")),
            ..setup_test_env(&temp, Mode::Production)
        };
        fs::write(temp.path().join("blocked"), "").unwrap();

        assert!(AppContext::init(&env, temp.path()).is_err());
    }
}

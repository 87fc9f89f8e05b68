use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::env::{EnvContext, Mode, TOKENIZER_CACHE_VAR};

/// Namespace segment under the XDG bases
pub const NAMESPACE: &str = "plandex";
/// Credentials file, relative to the config root
pub const AUTH_FILE: &str = "auth.json";
/// Account list, relative to the config root
pub const ACCOUNTS_FILE: &str = "accounts.json";
/// Tokenizer vocabulary cache, relative to the cache root
pub const TIKTOKEN_DIR: &str = "tiktoken";
/// Per-project plan index
pub const CURRENT_PLANS_FILE: &str = "current-plans.json";
/// Per-plan settings
pub const PLAN_SETTINGS_FILE: &str = "settings.json";

/// All computed paths used by plandex
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paths {
    pub mode: Mode,
    pub home: PathBuf,
    /// <config-base>/plandex/<version>
    pub config_root: PathBuf,
    /// <cache-base>/plandex/<version>
    pub cache_root: PathBuf,
    /// ~/.plandex-home-v2 (migration source only)
    pub legacy_root: PathBuf,
    /// <config-root>/auth.json
    pub auth_file: PathBuf,
    /// <config-root>/accounts.json
    pub accounts_file: PathBuf,
    /// <cache-root>/tiktoken
    pub tiktoken_dir: PathBuf,
}

impl Paths {
    /// Compute every path from the environment context. Touches no files.
    pub fn resolve(env: &EnvContext) -> Self {
        let version = env.mode.version_segment();
        let config_root = env.config_base().join(NAMESPACE).join(version);
        let cache_root = env.cache_base().join(NAMESPACE).join(version);
        let legacy_root = env.home.join(env.mode.legacy_dir_name());

        Self {
            mode: env.mode,
            home: env.home.clone(),
            auth_file: config_root.join(AUTH_FILE),
            accounts_file: config_root.join(ACCOUNTS_FILE),
            tiktoken_dir: cache_root.join(TIKTOKEN_DIR),
            config_root,
            cache_root,
            legacy_root,
        }
    }

    /// <config-root>/<project-id>
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.config_root.join(project_id)
    }

    /// <config-root>/<project-id>/current-plans.json
    pub fn current_plans_file(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(CURRENT_PLANS_FILE)
    }

    /// <config-root>/<project-id>/<plan-id>
    pub fn plan_dir(&self, project_id: &str, plan_id: &str) -> PathBuf {
        self.project_dir(project_id).join(plan_id)
    }

    /// <config-root>/<project-id>/<plan-id>/settings.json
    pub fn plan_settings_file(&self, project_id: &str, plan_id: &str) -> PathBuf {
        self.plan_dir(project_id, plan_id).join(PLAN_SETTINGS_FILE)
    }

    /// Ensure the config root, cache root and tokenizer cache exist.
    ///
    /// Nothing downstream works without these, so callers treat an error as fatal.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.config_root, &self.cache_root, &self.tiktoken_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        Ok(())
    }

    /// Point the tokenizer library at our cache root.
    pub fn export_tokenizer_cache_env(&self) {
        // Runs during single-threaded startup, before anything reads the environment.
        unsafe { std::env::set_var(TOKENIZER_CACHE_VAR, &self.cache_root) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::EnvVarGuard;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_roots() {
        let env = EnvContext::with_home("/home/alice", Mode::Production);
        let paths = Paths::resolve(&env);

        assert!(paths.config_root.ends_with(".config/plandex/v2"));
        assert!(paths.cache_root.ends_with(".cache/plandex/v2"));
        assert_eq!(paths.config_root, PathBuf::from("/home/alice/.config/plandex/v2"));
        assert_eq!(paths.legacy_root, PathBuf::from("/home/alice/.plandex-home-v2"));
        assert_eq!(paths.auth_file, paths.config_root.join("auth.json"));
        assert_eq!(paths.accounts_file, paths.config_root.join("accounts.json"));
        assert_eq!(paths.tiktoken_dir, paths.cache_root.join("tiktoken"));
    }

    #[test]
    fn test_override_roots() {
        let env = EnvContext {
            mode: Mode::Production,
            home: PathBuf::from("/home/alice"),
            xdg_config_home: Some(PathBuf::from("/srv/config")),
            xdg_cache_home: Some(PathBuf::from("/srv/cache")),
        };
        let paths = Paths::resolve(&env);

        assert_eq!(paths.config_root, PathBuf::from("/srv/config/plandex/v2"));
        assert_eq!(paths.cache_root, PathBuf::from("/srv/cache/plandex/v2"));
        // The legacy root always stays under home
        assert_eq!(paths.legacy_root, PathBuf::from("/home/alice/.plandex-home-v2"));
    }

    #[test]
    fn test_development_roots_do_not_collide() {
        let prod = Paths::resolve(&EnvContext::with_home("/home/alice", Mode::Production));
        let dev = Paths::resolve(&EnvContext::with_home("/home/alice", Mode::Development));

        assert!(dev.config_root.ends_with(".config/plandex/dev-v2"));
        assert!(dev.cache_root.ends_with(".cache/plandex/dev-v2"));
        assert_eq!(dev.legacy_root, PathBuf::from("/home/alice/.plandex-home-dev-v2"));
        assert_ne!(prod.config_root, dev.config_root);
        assert_ne!(prod.cache_root, dev.cache_root);
        assert_ne!(prod.legacy_root, dev.legacy_root);
    }

    #[test]
    fn test_project_paths() {
        let paths = Paths::resolve(&EnvContext::with_home("/home/alice", Mode::Production));
        assert!(paths.current_plans_file("proj1").ends_with("v2/proj1/current-plans.json"));
        assert!(
            paths
                .plan_settings_file("proj1", "planA")
                .ends_with("v2/proj1/planA/settings.json")
        );
        assert!(paths.plan_dir("proj1", "planA").starts_with(&paths.config_root));
    }

    #[test]
    fn test_ensure_dirs_creates_roots() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::resolve(&EnvContext::with_home(temp.path(), Mode::Production));

        paths.ensure_dirs().unwrap();
        assert!(paths.config_root.is_dir());
        assert!(paths.cache_root.is_dir());
        assert!(paths.tiktoken_dir.is_dir());

        // Idempotent
        paths.ensure_dirs().unwrap();
    }

    #[test]
    fn test_ensure_dirs_fails_when_blocked() {
        let temp = TempDir::new().unwrap();
        // A regular file where the .config directory should be
        std::fs::write(temp.path().join(".config"), "").unwrap();
        let paths = Paths::resolve(&EnvContext::with_home(temp.path(), Mode::Production));

        let err = paths.ensure_dirs().unwrap_err();
        assert!(err.to_string().contains("Failed to create directory"));
    }

    #[test]
    #[serial]
    fn test_export_tokenizer_cache_env() {
        let _guard = EnvVarGuard::unset(TOKENIZER_CACHE_VAR);
        let paths = Paths::resolve(&EnvContext::with_home("/home/alice", Mode::Production));

        paths.export_tokenizer_cache_env();
        assert_eq!(
            std::env::var_os(TOKENIZER_CACHE_VAR).map(PathBuf::from),
            Some(paths.cache_root.clone())
        );
    }
}

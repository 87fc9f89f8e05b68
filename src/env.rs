//! Environment context consulted during path resolution.
//!
//! Everything that depends on the process environment is read once here,
//! so the rest of the crate works from an explicit value that tests can
//! build by hand.

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Selects between the production and development directory names
pub const MODE_VAR: &str = "PLANDEX_ENV";
/// Overrides the `~/.config` base
pub const CONFIG_HOME_VAR: &str = "XDG_CONFIG_HOME";
/// Overrides the `~/.cache` base
pub const CACHE_HOME_VAR: &str = "XDG_CACHE_HOME";
/// Exported for the tokenizer library's on-disk vocabulary cache
pub const TOKENIZER_CACHE_VAR: &str = "TIKTOKEN_CACHE_DIR";

/// Which set of directory names to use.
///
/// Development mode lets a dev build run alongside an installed release
/// without either touching the other's files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Development,
}

impl Mode {
    /// Lowercase name, as shown to users and serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Development => "development",
        }
    }

    /// Interpret the raw value of `PLANDEX_ENV`
    pub fn from_flag(value: Option<&str>) -> Self {
        match value {
            Some("development") => Mode::Development,
            _ => Mode::Production,
        }
    }

    /// Layout version segment appended under `plandex/`
    pub fn version_segment(&self) -> &'static str {
        match self {
            Mode::Production => "v2",
            Mode::Development => "dev-v2",
        }
    }

    /// Name of the pre-XDG home directory
    pub fn legacy_dir_name(&self) -> &'static str {
        match self {
            Mode::Production => ".plandex-home-v2",
            Mode::Development => ".plandex-home-dev-v2",
        }
    }

    /// Name of the per-project marker directory
    pub fn marker_dir_name(&self) -> &'static str {
        match self {
            Mode::Production => ".plandex-v2",
            Mode::Development => ".plandex-dev-v2",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the environment inputs used by the path resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvContext {
    pub mode: Mode,
    pub home: PathBuf,
    /// `XDG_CONFIG_HOME`, if set to a non-empty value
    pub xdg_config_home: Option<PathBuf>,
    /// `XDG_CACHE_HOME`, if set to a non-empty value
    pub xdg_cache_home: Option<PathBuf>,
}

impl EnvContext {
    /// Read the context from the current process environment.
    ///
    /// Fails only when the home directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Couldn't find home directory")?;
        let mode = Mode::from_flag(std::env::var(MODE_VAR).ok().as_deref());

        Ok(Self {
            mode,
            home: base_dirs.home_dir().to_path_buf(),
            xdg_config_home: non_empty_var(CONFIG_HOME_VAR),
            xdg_cache_home: non_empty_var(CACHE_HOME_VAR),
        })
    }

    /// A context rooted at `home` with no XDG overrides
    pub fn with_home(home: impl AsRef<Path>, mode: Mode) -> Self {
        Self {
            mode,
            home: home.as_ref().to_path_buf(),
            xdg_config_home: None,
            xdg_cache_home: None,
        }
    }

    /// Base directory for configuration (`$XDG_CONFIG_HOME` or `~/.config`)
    pub fn config_base(&self) -> PathBuf {
        self.xdg_config_home
            .clone()
            .unwrap_or_else(|| self.home.join(".config"))
    }

    /// Base directory for caches (`$XDG_CACHE_HOME` or `~/.cache`)
    pub fn cache_base(&self) -> PathBuf {
        self.xdg_cache_home
            .clone()
            .unwrap_or_else(|| self.home.join(".cache"))
    }
}

fn non_empty_var(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

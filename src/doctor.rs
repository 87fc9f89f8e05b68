//! Diagnostics for the plandex home layout.
//!
//! `plandex-fs doctor` checks:
//! - the config, cache and tokenizer cache directories exist
//! - the credentials file is private to its owner
//! - the state of the legacy home and what migration did with it
//! - whether the working directory is a project root
//!
//! It reports each check with a pass/fail/warn status.

use anstyle::AnsiColor;
use std::env;
use std::path::Path;

use crate::context::AppContext;
use crate::env::{CACHE_HOME_VAR, CONFIG_HOME_VAR, MODE_VAR, TOKENIZER_CACHE_VAR};
use crate::fs_utils::{PRIVATE_FILE_MODE, dir_size, file_mode, human_size};
use crate::migrate::MigrationOutcome;
use crate::ui::Ui;

/// Permission state of the credentials file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsStatus {
    Missing,
    Private,
    /// Readable or writable by group/others; carries the actual mode
    TooOpen(u32),
    /// The platform has no Unix permission bits
    Unknown,
}

impl CredentialsStatus {
    pub fn detect(path: &Path) -> Self {
        match file_mode(path) {
            Err(_) => Self::Missing,
            Ok(None) => Self::Unknown,
            Ok(Some(mode)) if mode & !PRIVATE_FILE_MODE != 0 => Self::TooOpen(mode),
            Ok(Some(_)) => Self::Private,
        }
    }
}

/// Run the doctor diagnostics, returning how many checks found problems
pub fn run_doctor(ctx: &AppContext, ui: &Ui) -> usize {
    let paths = &ctx.paths;
    let mut failed = 0;

    ui.section("plandex Doctor");
    ui.newline();

    failed += !check_step(ui, "Directories", || {
        let mut ok = true;
        for (label, dir) in [
            ("Config root", &paths.config_root),
            ("Cache root", &paths.cache_root),
            ("Tokenizer cache", &paths.tiktoken_dir),
        ] {
            if dir.is_dir() {
                ui.println(format!("  {} {}: {}", ui.icon_ok(), label, dir.display()));
            } else {
                ui.println(format!("  {} {} missing: {}", ui.icon_err(), label, dir.display()));
                ok = false;
            }
        }
        ok
    }) as usize;

    failed += !check_step(ui, "Credentials", || {
        let ok = match CredentialsStatus::detect(&paths.auth_file) {
            CredentialsStatus::Missing => {
                ui.println(format!("  {} Not signed in (no auth.json)", ui.icon_info()));
                true
            }
            CredentialsStatus::Private => {
                ui.println(format!("  {} auth.json is owner-only (0600)", ui.icon_ok()));
                true
            }
            CredentialsStatus::TooOpen(mode) => {
                ui.println(format!(
                    "  {} auth.json has mode {:04o}, expected 0600",
                    ui.icon_err(),
                    mode
                ));
                false
            }
            CredentialsStatus::Unknown => {
                ui.println(format!("  {} auth.json present", ui.icon_ok()));
                true
            }
        };
        if paths.accounts_file.is_file() {
            ui.println(format!("  {} accounts.json present", ui.icon_ok()));
        }
        ok
    }) as usize;

    failed += !check_step(ui, "Legacy Home", || {
        if !paths.legacy_root.exists() {
            ui.println(format!(
                "  {} No legacy directory at {}",
                ui.icon_info(),
                paths.legacy_root.display()
            ));
            return true;
        }

        ui.println(format!(
            "  {} Legacy directory found: {}",
            ui.icon_info(),
            paths.legacy_root.display()
        ));
        match ctx.migration.outcome {
            MigrationOutcome::NoLegacyRoot => {}
            MigrationOutcome::AlreadyMigrated => {
                ui.println(format!("  {} Already migrated", ui.icon_ok()));
            }
            MigrationOutcome::Migrated => {
                ui.println(format!(
                    "  {} Migrated {} file(s) this run",
                    ui.icon_ok(),
                    ctx.migration.copied().count()
                ));
            }
        }
        let failures = ctx.migration.failures().count();
        if failures > 0 {
            ui.println(format!(
                "  {} {} migration step(s) failed; run `plandex-fs migrate` for details",
                ui.icon_warn(),
                failures
            ));
        }
        failures == 0
    }) as usize;

    failed += !check_step(ui, "Cache", || {
        match dir_size(&paths.tiktoken_dir) {
            Ok(size) => {
                ui.println(format!("  {} Tokenizer cache: {}", ui.icon_ok(), human_size(size)));
                true
            }
            Err(e) => {
                ui.println(format!("  {} Cannot read tokenizer cache: {}", ui.icon_err(), e));
                false
            }
        }
    }) as usize;

    failed += !check_step(ui, "Project", || {
        match &ctx.project.marker_dir {
            Some(marker) => {
                ui.println(format!(
                    "  {} Project root: {}",
                    ui.icon_ok(),
                    ctx.project.cwd.display()
                ));
                ui.println(format!("  {} Marker: {}", ui.icon_info(), marker.display()));
                if ctx.project.root_is_git_repo() {
                    ui.println(format!("  {} Inside a git repository", ui.icon_ok()));
                } else {
                    ui.println(format!("  {} Not a git repository", ui.icon_info()));
                }
            }
            None => ui.println(format!(
                "  {} {} is not a project root (run `plandex-fs init`)",
                ui.icon_info(),
                ctx.project.cwd.display()
            )),
        }
        true
    }) as usize;

    check_step(ui, "Environment", || {
        for key in [MODE_VAR, CONFIG_HOME_VAR, CACHE_HOME_VAR, TOKENIZER_CACHE_VAR] {
            match env::var(key) {
                Ok(value) if !value.is_empty() => {
                    ui.println(format!("  {} {}={}", ui.icon_info(), key, value))
                }
                _ => ui.println(format!("  {} {} not set", ui.icon_info(), key)),
            }
        }
        true
    });

    failed
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}

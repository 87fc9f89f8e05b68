//! Handler functions for each CLI subcommand.
//!
//! Every handler receives the [`AppContext`] built by the startup sequence,
//! so the directories already exist and migration has already run.

use anstyle::AnsiColor;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::context::AppContext;
use crate::doctor::run_doctor;
use crate::migrate::{MigrationOutcome, MigrationReport, StepStatus, retry_paths};
use crate::paths::Paths;
use crate::ui::Ui;

#[derive(Serialize)]
struct PathsOutput<'a> {
    #[serde(flatten)]
    paths: &'a Paths,
    marker_dir: Option<&'a Path>,
    project_root: Option<&'a Path>,
}

/// Show every resolved location
pub fn paths(ctx: &AppContext, ui: &Ui, json: bool) -> Result<()> {
    if json {
        let output = PathsOutput {
            paths: &ctx.paths,
            marker_dir: ctx.project.marker_dir.as_deref(),
            project_root: ctx.project.root.as_deref(),
        };
        let rendered =
            serde_json::to_string_pretty(&output).context("Failed to serialize paths")?;
        ui.println(rendered);
        return Ok(());
    }

    let p = &ctx.paths;
    let mut table = ui.simple_table();
    table.add_row(vec![ui.cell("Mode:"), ui.header_cell(p.mode.as_str())]);
    table.add_row(vec![ui.cell("Config root:"), ui.path_cell(&p.config_root)]);
    table.add_row(vec![ui.cell("Cache root:"), ui.path_cell(&p.cache_root)]);
    table.add_row(vec![ui.cell("Credentials:"), ui.path_cell(&p.auth_file)]);
    table.add_row(vec![ui.cell("Accounts:"), ui.path_cell(&p.accounts_file)]);
    table.add_row(vec![ui.cell("Legacy home:"), ui.path_cell(&p.legacy_root)]);
    let project_root = match &ctx.project.root {
        Some(root) => ui.cell(root.display().to_string()),
        None => ui.cell("(none)"),
    };
    table.add_row(vec![ui.cell("Project root:"), project_root]);

    ui.section("Paths");
    ui.println(table.to_string());
    Ok(())
}

/// Mark the working directory as a project root
pub fn init(ctx: &mut AppContext, ui: &Ui) -> Result<()> {
    let (marker, created) = ctx.project.find_or_create()?;

    if created {
        ui.ok(format!("Created {}", marker.display()));
    } else {
        ui.info(format!("Already a project root ({})", marker.display()));
    }

    if !ctx.project.root_is_git_repo() {
        ui.println(ui.dim("  Not a git repository"));
    }
    Ok(())
}

/// Show what the startup migration did, retrying once if any step failed
pub fn migrate(ctx: &AppContext, ui: &Ui) -> Result<()> {
    print_report(&ctx.migration, ui);
    if ctx.migration.failures().next().is_none() {
        return Ok(());
    }

    // Credentials exist by now, so go around the guard
    ui.newline();
    let pb = ui.spinner("Retrying failed migration steps...");
    let retry = retry_paths(&ctx.paths);
    let copied = retry.copied().count();
    ui.spinner_finish_ok(&pb, format!("Retry copied {} file(s)", copied));

    let still_failing = retry.failures().count();
    if still_failing > 0 {
        ui.err(format!("{} step(s) still failing", still_failing));
        print_steps(&retry, ui);
    }
    Ok(())
}

fn print_report(report: &MigrationReport, ui: &Ui) {
    match report.outcome {
        MigrationOutcome::NoLegacyRoot => {
            ui.info("No legacy directory found; nothing to migrate.");
        }
        MigrationOutcome::AlreadyMigrated => {
            ui.info("Credentials already present in the config root; migration skipped.");
        }
        MigrationOutcome::Migrated if report.is_noop() => {
            ui.info("Nothing left to migrate.");
        }
        MigrationOutcome::Migrated => {
            ui.ok(format!(
                "Migrated {} file(s) from the legacy directory.",
                report.copied().count()
            ));
            print_steps(report, ui);
        }
    }
}

fn print_steps(report: &MigrationReport, ui: &Ui) {
    let mut table = ui.table();
    table.set_header(vec![ui.header_cell("Status"), ui.header_cell("Destination")]);

    for step in &report.steps {
        let status = match &step.status {
            StepStatus::Copied { bytes } => {
                ui.colored_cell(format!("copied ({} B)", bytes), AnsiColor::Green)
            }
            StepStatus::CreatedDir => ui.cell("mkdir"),
            StepStatus::SkippedExists => ui.cell("exists"),
            StepStatus::SkippedMissing => continue,
            StepStatus::Failed(reason) => {
                ui.colored_cell(format!("failed: {}", reason), AnsiColor::Red)
            }
        };
        table.add_row(vec![status, ui.cell(step.destination.display().to_string())]);
    }

    ui.println(table.to_string());
}

/// Report whether the working directory is a project root
pub fn status(ctx: &AppContext, ui: &Ui) -> Result<()> {
    let project = &ctx.project;
    let mut table = ui.simple_table();

    table.add_row(vec![ui.cell("Directory:"), ui.cell(project.cwd.display().to_string())]);
    match &project.marker_dir {
        Some(marker) => {
            table.add_row(vec![
                ui.cell("Project root:"),
                ui.colored_cell("yes", AnsiColor::Green),
            ]);
            table.add_row(vec![ui.cell("Marker:"), ui.cell(marker.display().to_string())]);
        }
        None => {
            table.add_row(vec![ui.cell("Project root:"), ui.cell("no")]);
        }
    }
    let git = if project.root_is_git_repo() { "yes" } else { "no" };
    table.add_row(vec![ui.cell("Git repository:"), ui.cell(git)]);

    ui.section("Project");
    ui.println(table.to_string());

    if !project.is_project_root() {
        ui.newline();
        ui.println(format!("Create one with:\n  {} init", ui.bold("plandex-fs")));
    }
    Ok(())
}

/// Run diagnostics; fails if any check found a problem
pub fn doctor(ctx: &AppContext, ui: &Ui) -> Result<()> {
    let issues = run_doctor(ctx, ui);
    if issues > 0 {
        anyhow::bail!("{} check(s) reported issues", issues);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Mode;
    use crate::test_utils::{setup_test_env, write_file};
    use crate::ui::ColorMode;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    fn test_ctx(temp: &TempDir) -> AppContext {
        let env = setup_test_env(temp, Mode::Production);
        let cwd = temp.path().join("work");
        fs::create_dir_all(&cwd).unwrap();
        AppContext::init(&env, cwd).unwrap()
    }

    #[test]
    #[serial]
    fn test_init_creates_marker_once() {
        let temp = TempDir::new().unwrap();
        let mut ctx = test_ctx(&temp);
        let ui = test_ui();

        init(&mut ctx, &ui).unwrap();
        assert!(temp.path().join("work/.plandex-v2").is_dir());
        assert!(ctx.project.is_project_root());

        // Second call finds the existing marker
        init(&mut ctx, &ui).unwrap();
    }

    #[test]
    #[serial]
    fn test_paths_and_status_render() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(&temp);
        let ui = test_ui();

        assert!(paths(&ctx, &ui, false).is_ok());
        assert!(paths(&ctx, &ui, true).is_ok());
        assert!(status(&ctx, &ui).is_ok());
    }

    #[test]
    #[serial]
    fn test_paths_json_shape() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(&temp);
        let output = PathsOutput {
            paths: &ctx.paths,
            marker_dir: None,
            project_root: None,
        };

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["mode"], "production");
        assert!(value["config_root"].as_str().unwrap().ends_with("plandex/v2"));
        assert!(value["project_root"].is_null());
    }

    #[test]
    #[serial]
    fn test_migrate_reports_startup_run() {
        let temp = TempDir::new().unwrap();
        let env = setup_test_env(&temp, Mode::Production);
        write_file(&env.home.join(".plandex-home-v2"), "accounts.json", "[]");
        let ctx = AppContext::init(&env, temp.path()).unwrap();

        assert_eq!(ctx.migration.copied().count(), 1);
        assert!(migrate(&ctx, &test_ui()).is_ok());
    }

    #[test]
    #[serial]
    fn test_migrate_retries_failed_steps() {
        let temp = TempDir::new().unwrap();
        let env = setup_test_env(&temp, Mode::Production);
        let legacy = env.home.join(".plandex-home-v2");
        write_file(&legacy, "auth.json", "token");
        write_file(&legacy, "proj1/current-plans.json", "plans");
        let blocker = write_file(&env.home.join(".config/plandex/v2"), "proj1", "blocker");

        let ctx = AppContext::init(&env, temp.path()).unwrap();
        assert_eq!(ctx.migration.failures().count(), 1);

        fs::remove_file(blocker).unwrap();
        assert!(migrate(&ctx, &test_ui()).is_ok());
        assert_eq!(
            fs::read_to_string(ctx.paths.current_plans_file("proj1")).unwrap(),
            "plans"
        );
    }

    #[test]
    #[serial]
    fn test_migrate_keeps_reporting_blocked_step() {
        let temp = TempDir::new().unwrap();
        let env = setup_test_env(&temp, Mode::Production);
        let legacy = env.home.join(".plandex-home-v2");
        write_file(&legacy, "auth.json", "token");
        write_file(&legacy, "proj1/current-plans.json", "plans");
        let blocker = write_file(&env.home.join(".config/plandex/v2"), "proj1", "blocker");

        let ctx = AppContext::init(&env, temp.path()).unwrap();
        assert!(migrate(&ctx, &test_ui()).is_ok());
        assert_eq!(fs::read_to_string(blocker).unwrap(), "blocker");
    }
}

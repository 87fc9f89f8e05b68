use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use plandex_fs::{
    commands,
    context::AppContext,
    ui::{ColorMode, Ui},
};

/// Log filter, e.g. `PLANDEX_FS_LOG=plandex_fs=debug`
const LOG_ENV: &str = "PLANDEX_FS_LOG";

#[derive(Parser)]
#[command(name = "plandex-fs")]
#[command(
    about = "Resolve plandex home directories, migrate the legacy layout, and manage project roots"
)]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved config, cache, legacy and project paths
    Paths {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark the current directory as a project root
    Init,

    /// Show the legacy migration report and retry failed steps
    Migrate,

    /// Show whether the current directory is a project root
    Status,

    /// Run diagnostics on the plandex home layout
    Doctor,

    /// Generate a shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Commands::Completion { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "plandex-fs", &mut std::io::stdout());
        return Ok(());
    }

    let ui = Ui::new(cli.color, cli.no_color);
    let mut ctx = AppContext::from_process()?;

    match cli.command {
        Commands::Paths { json } => commands::paths(&ctx, &ui, json),
        Commands::Init => commands::init(&mut ctx, &ui),
        Commands::Migrate => commands::migrate(&ctx, &ui),
        Commands::Status => commands::status(&ctx, &ui),
        Commands::Doctor => commands::doctor(&ctx, &ui),
        Commands::Completion { .. } => Ok(()),
    }
}

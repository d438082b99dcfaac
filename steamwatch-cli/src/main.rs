//! steamwatch: track Steam store prices, release dates and platform support.
//!
//! # Usage
//!
//! ```text
//! steamwatch watch <app> [--threshold PRICE]
//! steamwatch unwatch <app> [--delete]
//! steamwatch ls [--all] [--format tree|tab] [--json]
//! steamwatch fetch [--games <app>...] [--json]
//! steamwatch report [--games <app>...] [-n LIMIT] [--format tree|tab] [--json]
//! steamwatch recent [-n LIMIT] [--format tree|tab] [--json]
//! ```
//!
//! `<app>` is an app id or a store URL.

mod commands;
mod hooks;
mod logging;
mod render;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use commands::{
    fetch::FetchArgs, ls::LsArgs, recent::RecentArgs, report::ReportArgs, unwatch::UnwatchArgs,
    watch::WatchArgs, Session,
};
use steamwatch_core::{config, extract_app_id, AppId};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "steamwatch",
    version,
    about = "Watch Steam store apps for price, release and platform changes",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// Show debug output on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show nothing on stderr except errors returned by the command.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write log output to this file.
    #[arg(short, long, global = true, value_name = "PATH")]
    logfile: Option<PathBuf>,

    /// Level for the log file.
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    log_level: LevelFilter,

    /// Config file to use instead of ~/.config/steamwatch/config.yaml.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start watching an app and fetch it once.
    Watch(WatchArgs),

    /// Stop watching an app.
    Unwatch(UnwatchArgs),

    /// List watched apps and their packages.
    Ls(LsArgs),

    /// Fetch watched apps and notify about changes.
    Fetch(FetchArgs),

    /// Show recorded changes per app and package.
    Report(ReportArgs),

    /// Show the newest changes across all apps.
    Recent(RecentArgs),
}

// ---------------------------------------------------------------------------
// Shared app id argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse an app id or store URL.
#[derive(Debug, Clone, Copy)]
pub struct AppIdArg(pub AppId);

impl FromStr for AppIdArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        extract_app_id(s).map(Self).map_err(|e| e.to_string())
    }
}

impl fmt::Display for AppIdArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppIdArg> for AppId {
    fn from(a: AppIdArg) -> Self {
        a.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = cli.global;

    logging::init(&logging::LogOptions {
        verbose: global.verbose,
        quiet: global.quiet,
        logfile: global.logfile,
        file_level: global.log_level,
    })?;

    let home = config::home().context("could not determine home directory")?;
    let config = match &global.config {
        Some(path) => config::load_from(path),
        None => config::load_at(&home),
    }
    .context("failed to load config")?;
    let session = Session::new(config, home);

    match cli.command {
        Commands::Watch(args) => args.run(&session),
        Commands::Unwatch(args) => args.run(&session),
        Commands::Ls(args) => args.run(&session),
        Commands::Fetch(args) => args.run(&session),
        Commands::Report(args) => args.run(&session),
        Commands::Recent(args) => args.run(&session),
    }
}

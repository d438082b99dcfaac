//! Subcommand implementations.
//!
//! Each subcommand is a clap `Args` struct with a `run(self, &Session)`
//! method; [`Session`] carries what every command needs.

pub mod fetch;
pub mod ls;
pub mod recent;
pub mod report;
pub mod unwatch;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};

use steamwatch_core::{Config, OutputFormat, SnapshotStore};
use steamwatch_storeapi::SteamStoreApi;
use steamwatch_sync::{Coordinator, NotificationBus};

use crate::hooks;

/// Loaded configuration plus the resolved home directory.
#[derive(Debug)]
pub struct Session {
    pub config: Config,
    pub home: PathBuf,
}

impl Session {
    pub fn new(config: Config, home: PathBuf) -> Self {
        Self { config, home }
    }

    pub fn db_path(&self) -> PathBuf {
        self.config.db_path_at(&self.home)
    }

    /// Open the store and wire the store API and observers together.
    pub fn coordinator(&self) -> Result<Coordinator<SteamStoreApi>> {
        let path = self.db_path();
        let store = SnapshotStore::open(&path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        tracing::debug!(db = %path.display(), "opened store");

        let mut bus = NotificationBus::new();
        hooks::register(&mut bus, &self.config.hooks);
        Ok(Coordinator::with_bus(
            store,
            SteamStoreApi::from_config(&self.config),
            bus,
        ))
    }
}

/// `--format` value for commands that render tables or trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormatArg {
    Tree,
    Tab,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Tree => OutputFormat::Tree,
            FormatArg::Tab => OutputFormat::Tab,
        }
    }
}

/// Flag value if given, else the configured default.
pub fn resolve_format(flag: Option<FormatArg>, configured: OutputFormat) -> OutputFormat {
    flag.map(OutputFormat::from).unwrap_or(configured)
}

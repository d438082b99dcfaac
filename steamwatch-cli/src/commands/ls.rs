//! `steamwatch ls`: list watched apps and their packages.

use anyhow::{Context, Result};
use clap::Args;

use steamwatch_core::OutputFormat;

use super::{resolve_format, FormatArg, Session};
use crate::render;

/// Arguments for `steamwatch ls`.
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Include disabled apps.
    #[arg(short, long)]
    pub all: bool,

    /// Output layout; defaults to `list_format` from the config.
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl LsArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let apps = session
            .coordinator()?
            .ls(self.all)
            .context("failed to list watched apps")?;

        if self.json {
            return render::print_json(&apps);
        }
        let text = match resolve_format(self.format, session.config.list_format) {
            OutputFormat::Tree => render::apps_tree(&apps),
            OutputFormat::Tab => render::apps_table(&apps),
        };
        println!("{text}");
        Ok(())
    }
}

//! `steamwatch recent`: newest changes across all apps.

use anyhow::{Context, Result};
use clap::Args;

use steamwatch_core::OutputFormat;

use super::{resolve_format, FormatArg, Session};
use crate::render;

/// Arguments for `steamwatch recent`.
#[derive(Args, Debug)]
pub struct RecentArgs {
    /// Number of changes to show; defaults to `recent_limit`.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output layout; defaults to `recent_format` from the config.
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl RecentArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let limit = self.limit.unwrap_or(session.config.recent_limit);
        let changes = session
            .coordinator()?
            .recent(Some(limit))
            .context("failed to load recent changes")?;

        if self.json {
            return render::print_json(&changes);
        }
        let text = match resolve_format(self.format, session.config.recent_format) {
            OutputFormat::Tree => render::recent_tree(&changes),
            OutputFormat::Tab => render::recent_table(&changes),
        };
        println!("{text}");
        Ok(())
    }
}

//! `steamwatch report`: change history per app and package.

use anyhow::{Context, Result};
use clap::Args;

use steamwatch_core::{AppId, OutputFormat};

use super::{resolve_format, FormatArg, Session};
use crate::render;
use crate::AppIdArg;

/// Arguments for `steamwatch report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Report only these apps; every enabled app when omitted.
    #[arg(short = 'g', long = "games", value_name = "APP", num_args = 1..)]
    pub games: Vec<AppIdArg>,

    /// Entries per app and per package; defaults to `report_limit`.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output layout; defaults to `report_format` from the config.
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let coordinator = session.coordinator()?;
        let limit = self.limit.or(session.config.report_limit);

        let reports = if self.games.is_empty() {
            coordinator.report_all(limit).context("failed to build report")?
        } else {
            self.games
                .into_iter()
                .map(AppId::from)
                .map(|id| {
                    coordinator
                        .report(id, limit)
                        .with_context(|| format!("failed to build report for app {id}"))
                })
                .collect::<Result<Vec<_>>>()?
        };

        if self.json {
            return render::print_json(&reports);
        }
        let text = match resolve_format(self.format, session.config.report_format) {
            OutputFormat::Tree => render::reports_tree(&reports),
            OutputFormat::Tab => render::reports_table(&reports),
        };
        println!("{text}");
        Ok(())
    }
}

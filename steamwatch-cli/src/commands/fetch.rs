//! `steamwatch fetch`: run a fetch cycle for watched apps.

use anyhow::{bail, Context, Result};
use clap::Args;

use steamwatch_core::AppId;

use super::Session;
use crate::render;
use crate::AppIdArg;

/// Arguments for `steamwatch fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Fetch only these apps; every enabled app when omitted.
    #[arg(short = 'g', long = "games", value_name = "APP", num_args = 1..)]
    pub games: Vec<AppIdArg>,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut coordinator = session.coordinator()?;
        let report = if self.games.is_empty() {
            coordinator.fetch_all().context("failed to list watched apps")?
        } else {
            let ids: Vec<AppId> = self.games.into_iter().map(AppId::from).collect();
            coordinator.fetch_many(&ids)
        };

        if self.json {
            render::print_json(&report)?;
        } else {
            println!("{}", render::run_summary(&report));
        }

        let failed = report.failed().count();
        if failed > 0 {
            bail!("{failed} app(s) failed to fetch");
        }
        Ok(())
    }
}

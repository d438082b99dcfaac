//! `steamwatch watch`: start tracking an app.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use steamwatch_core::{format_amount, to_minor_units};
use steamwatch_sync::WatchOutcome;

use super::Session;
use crate::render;
use crate::AppIdArg;

/// Arguments for `steamwatch watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// App id or store URL.
    pub app: AppIdArg,

    /// Notify when any package price drops to or below this amount.
    #[arg(short, long, value_name = "PRICE")]
    pub threshold: Option<f64>,
}

impl WatchArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let threshold = self
            .threshold
            .map(to_minor_units)
            .transpose()
            .context("invalid --threshold")?;
        let app_id = self.app.0;

        let mut coordinator = session.coordinator()?;
        let outcome = coordinator
            .watch(app_id, threshold)
            .with_context(|| format!("failed to watch app {app_id}"))?;

        match &outcome {
            WatchOutcome::AlreadyWatched(app) => {
                println!("{} ({}) is already watched.", app.display_name().bold(), app.id);
                if let Some(t) = threshold {
                    println!("Threshold set to {}.", format_amount(t, None));
                }
            }
            WatchOutcome::Added(report) | WatchOutcome::Reenabled(report) => {
                println!("{}", render::entity_line(report));
                if report.is_failed() {
                    bail!("watching app {app_id} did not complete");
                }
            }
        }
        Ok(())
    }
}

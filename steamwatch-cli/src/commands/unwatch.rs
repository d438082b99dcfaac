//! `steamwatch unwatch`: stop tracking an app.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::Session;
use crate::AppIdArg;

/// Arguments for `steamwatch unwatch`.
#[derive(Args, Debug)]
pub struct UnwatchArgs {
    /// App id or store URL.
    pub app: AppIdArg,

    /// Delete the app, its packages and its history instead of disabling it.
    #[arg(short, long)]
    pub delete: bool,
}

impl UnwatchArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let app_id = self.app.0;
        let mut coordinator = session.coordinator()?;
        let removed = coordinator
            .unwatch(app_id, self.delete)
            .with_context(|| format!("failed to unwatch app {app_id}"))?;

        match removed {
            Some(app) if self.delete => {
                println!("Deleted {} ({}).", app.display_name().bold(), app.id)
            }
            Some(app) => println!("Disabled {} ({}).", app.display_name().bold(), app.id),
            None => println!("App {app_id} is not watched."),
        }
        Ok(())
    }
}

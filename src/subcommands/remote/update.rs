//! `update` subcommand.

use crate::{cli::Session, ctx::StContext, subcommands::local::print_sync_report};
use anyhow::Result;
use clap::Args;
use itertools::Itertools;
use nu_ansi_term::Color;

/// CLI arguments for the `update` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UpdateCmd {
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    force: bool,
}

impl UpdateCmd {
    /// Run the `update` subcommand.
    pub async fn run(self, mut ctx: StContext<'_>, session: &Session) -> Result<()> {
        let prompt = format!(
            "Reset {} to the remote and delete merged branches?",
            ctx.trunk_names().iter().map(|t| format!("`{}`", t)).join(", ")
        );
        if !session.confirm(&prompt, self.force)? {
            return Ok(());
        }

        let reviews = session.reviews(false)?;
        let report = ctx.update_trunk(&reviews).await?;

        if !report.reset.is_empty() {
            println!("Reset {} to the remote.", report.reset.iter().join(", "));
        }
        for branch in report.deleted.iter() {
            println!("Deleted merged branch `{}`.", Color::Blue.paint(branch));
        }
        for (branch, parent) in report.reparented.iter() {
            println!(
                "Moved `{}` onto `{}`.",
                Color::Blue.paint(branch),
                Color::Blue.paint(parent)
            );
        }
        if !report.removed.is_empty() {
            println!(
                "Stopped tracking {}.",
                report.removed.iter().map(|b| Color::Blue.paint(b)).join(", ")
            );
        }
        print_sync_report(&report.sync);
        Ok(())
    }
}

//! `land` subcommand.

use crate::{cli::Session, ctx::StContext, subcommands::local::print_sync_report};
use anyhow::Result;
use clap::Args;
use itertools::Itertools;
use nu_ansi_term::Color;

/// CLI arguments for the `land` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct LandCmd {
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    force: bool,
}

impl LandCmd {
    /// Run the `land` subcommand.
    pub async fn run(self, mut ctx: StContext<'_>, session: &Session) -> Result<()> {
        let current = ctx.repository.current_branch()?;
        let graph = ctx.build_graph()?;
        let bottom = graph
            .bottom_of(&current)
            .map(|node| node.name.clone())
            .unwrap_or_else(|| current.clone());

        let prompt = format!(
            "Delete `{}` and restack the branches on it?",
            Color::Blue.paint(&bottom)
        );
        if !session.confirm(&prompt, self.force)? {
            return Ok(());
        }

        let reviews = session.reviews(false)?;
        let report = ctx.land(&reviews, &current).await?;
        println!(
            "Landed `{}`. Moved {} onto `{}`.",
            Color::Blue.paint(&report.landed),
            report.reparented.iter().map(|b| format!("`{}`", b)).join(", "),
            Color::Blue.paint(&report.trunk)
        );
        print_sync_report(&report.sync);
        Ok(())
    }
}

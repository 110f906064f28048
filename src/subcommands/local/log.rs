//! `log` subcommand.

use crate::ctx::StContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `log` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct LogCmd;

impl LogCmd {
    /// Run the `log` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> Result<()> {
        ctx.print_tree()?;

        if let Some(checkpoint) = ctx.store.checkpoint() {
            println!(
                "\n{} `{}` stopped on a conflict. Resolve it and run `{}`, or drop it with `{}`.",
                Color::Yellow.bold().paint("Interrupted:"),
                Color::Blue.paint(checkpoint.remaining.first().map_or("", String::as_str)),
                Color::Green.paint("stk continue"),
                Color::Green.paint("stk abort"),
            );
        }
        Ok(())
    }
}

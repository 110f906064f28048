//! `branch new` subcommand.

use crate::ctx::StContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `branch new` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CreateCmd {
    /// Name of the new branch. Prompts for one when omitted.
    name: Option<String>,
}

impl CreateCmd {
    /// Run the `branch new` subcommand.
    pub fn run(self, mut ctx: StContext<'_>) -> Result<()> {
        let name = match self.name {
            Some(name) => name,
            None => inquire::Text::new("Name of new branch:").prompt()?,
        };

        let record = ctx.create_branch(&name)?;
        println!(
            "Successfully created and tracked new branch `{}` on top of `{}`.",
            Blue.paint(&name),
            Blue.paint(&record.parent)
        );
        Ok(())
    }
}

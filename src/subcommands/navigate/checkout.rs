//! `branch checkout` subcommand.

use crate::ctx::StContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `branch checkout` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CheckoutCmd {
    /// The branch to check out. Prompts with the stack tree when omitted.
    branch: Option<String>,
}

impl CheckoutCmd {
    /// Run the `branch checkout` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> Result<()> {
        let branch = match self.branch {
            Some(branch) => branch,
            None => {
                let branches = ctx.display_branches()?;
                inquire::Select::new("Select a branch to checkout", branches)
                    .with_formatter(&|f| f.value.branch_name.clone())
                    .prompt()?
                    .branch_name
            }
        };

        ctx.repository.checkout(&branch)?;
        println!("Checked out `{}`.", Color::Blue.paint(&branch));
        Ok(())
    }
}

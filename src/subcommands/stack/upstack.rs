//! `upstack` subcommands.

use crate::{
    ctx::StContext,
    subcommands::local::print_sync_report,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use nu_ansi_term::Color::Blue;

/// The `upstack` subcommands.
#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum UpstackCmd {
    /// Move the checked out branch and its upstack onto another parent.
    Onto(OntoCmd),
    /// Stop tracking the checked out branch and treat it as a trunk.
    #[clap(alias = "as-base")]
    AsBottom(AsBottomCmd),
}

impl UpstackCmd {
    /// Run the `upstack` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> Result<()> {
        match self {
            Self::Onto(args) => args.run(ctx),
            Self::AsBottom(args) => args.run(ctx),
        }
    }
}

/// CLI arguments for the `upstack onto` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct OntoCmd {
    /// The new parent. Prompts with the stack tree when omitted.
    target: Option<String>,
}

impl OntoCmd {
    /// Run the `upstack onto` subcommand.
    pub fn run(self, mut ctx: StContext<'_>) -> Result<()> {
        let branch = ctx.repository.current_branch()?;
        let target = match self.target {
            Some(target) => target,
            None => {
                let prompt = format!("Select the new parent of `{}`", Blue.paint(&branch));
                inquire::Select::new(prompt.as_str(), ctx.display_branches()?)
                    .with_formatter(&|f| f.value.branch_name.clone())
                    .prompt()?
                    .branch_name
            }
        };

        let report = ctx.reparent(&branch, &target)?;
        println!(
            "Moved `{}` from `{}` onto `{}`.",
            Blue.paint(&branch),
            Blue.paint(&report.previous_parent),
            Blue.paint(&target)
        );
        print_sync_report(&report.sync);
        Ok(())
    }
}

/// CLI arguments for the `upstack as-bottom` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AsBottomCmd;

impl AsBottomCmd {
    /// Run the `upstack as-bottom` subcommand.
    pub fn run(self, mut ctx: StContext<'_>) -> Result<()> {
        let branch = ctx.repository.current_branch()?;
        let record = ctx.make_bottom(&branch)?;
        println!(
            "`{}` is now a stack bottom and no longer stacked on `{}`.",
            Blue.paint(&branch),
            Blue.paint(&record.parent)
        );
        Ok(())
    }
}

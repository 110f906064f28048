//! `commit` and `amend` subcommands.

use super::print_sync_report;
use crate::{ctx::StContext, git::CommitOptions};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `commit` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CommitCmd {
    /// The commit message. Opens the editor if omitted.
    #[arg(short, long)]
    message: Option<String>,
    /// Rewrite the last commit of the branch instead of adding one.
    #[arg(long)]
    amend: bool,
    /// Allow a commit without changes.
    #[arg(long)]
    allow_empty: bool,
    /// Keep the message of the amended commit.
    #[arg(long, requires = "amend")]
    no_edit: bool,
}

impl CommitCmd {
    /// Run the `commit` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> Result<()> {
        commit_and_sync(
            ctx,
            CommitOptions {
                message: self.message,
                amend: self.amend,
                allow_empty: self.allow_empty,
                no_edit: self.no_edit,
            },
        )
    }
}

/// CLI arguments for the `amend` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AmendCmd;

impl AmendCmd {
    /// Run the `amend` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> Result<()> {
        commit_and_sync(
            ctx,
            CommitOptions {
                amend: true,
                no_edit: true,
                ..Default::default()
            },
        )
    }
}

fn commit_and_sync(mut ctx: StContext<'_>, options: CommitOptions) -> Result<()> {
    let report = ctx.commit(&options)?;
    println!(
        "{} on `{}`.",
        if options.amend { "Amended" } else { "Committed" },
        Color::Blue.paint(&report.branch)
    );
    print_sync_report(&report.sync);
    Ok(())
}

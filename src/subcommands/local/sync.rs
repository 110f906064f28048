//! `sync`, `continue` and `abort` subcommands.

use crate::{
    ctx::{StContext, SyncOutcome, SyncReport},
    subcommands::SelectionArg,
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct SyncCmd {
    /// The part of the stack to sync.
    #[arg(value_enum, default_value_t)]
    selection: SelectionArg,
}

impl SyncCmd {
    /// Run the `sync` subcommand.
    pub fn run(self, mut ctx: StContext<'_>) -> Result<()> {
        let report = ctx.sync(self.selection.into())?;
        print_sync_report(&report);
        Ok(())
    }
}

/// CLI arguments for the `continue` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct ContinueCmd;

impl ContinueCmd {
    /// Run the `continue` subcommand.
    pub fn run(self, mut ctx: StContext<'_>) -> Result<()> {
        let report = ctx.continue_pending()?;
        print_sync_report(&report);
        Ok(())
    }
}

/// CLI arguments for the `abort` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AbortCmd;

impl AbortCmd {
    /// Run the `abort` subcommand.
    pub fn run(self, mut ctx: StContext<'_>) -> Result<()> {
        let checkpoint = ctx.discard_pending()?;
        println!(
            "Dropped the interrupted operation. {} branch(es) were left unsynced.",
            checkpoint.remaining.len()
        );
        if ctx.repository.rebase_in_progress()? {
            println!(
                "A rebase is still in progress. Run `{}` to restore the branch.",
                Color::Green.paint("git rebase --abort")
            );
        }
        Ok(())
    }
}

/// Prints one line per visited branch, and how to resume if the cascade halted.
pub fn print_sync_report(report: &SyncReport) {
    for (branch, outcome) in report.outcomes.iter() {
        let branch = Color::Blue.paint(branch);
        match outcome {
            SyncOutcome::AlreadySynced { parent } => {
                println!("`{}` is up to date with `{}`.", branch, parent)
            }
            SyncOutcome::Recorded { parent } => {
                println!("`{}` already contains `{}`.", branch, parent)
            }
            SyncOutcome::Rebased { onto } => println!(
                "{} `{}` onto `{}`.",
                Color::Green.paint("Rebased"),
                branch,
                onto
            ),
            SyncOutcome::Conflict { onto } => println!(
                "{} rebasing `{}` onto `{}`.",
                Color::Red.bold().paint("Conflict"),
                branch,
                onto
            ),
        }
    }

    if let Some(branch) = report.conflicted() {
        println!(
            "Resolve the conflicts in `{}`, run `{}`, then `{}`.",
            Color::Blue.paint(branch),
            Color::Green.paint("git rebase --continue"),
            Color::Green.paint("stk continue")
        );
    } else if report.rebased().is_empty() {
        println!("Nothing needed a rebase.");
    }
}

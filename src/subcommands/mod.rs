//! The subcommands for the `stk` application.

use crate::{cli::Session, ctx::{Selection, StContext}};
use clap::{Subcommand, ValueEnum};
use local::{AbortCmd, AmendCmd, CommitCmd, ContinueCmd, LogCmd, SyncCmd};
use navigate::BranchCmd;
use remote::{LandCmd, PushCmd, UpdateCmd};
use stack::{AdoptCmd, UpstackCmd};

mod local;
mod navigate;
mod remote;
mod stack;

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum Subcommands {
    /// Print a tree of all tracked branches, with drift markers: `!` needs a sync, `~` differs
    /// from the remote, `*` is checked out.
    #[clap(aliases = ["l", "ls", "info"])]
    Log(LogCmd),
    /// Create, navigate between, and check out tracked branches.
    #[clap(subcommand, alias = "b")]
    Branch(BranchCmd),
    /// Start tracking an existing local branch.
    Adopt(AdoptCmd),
    /// Commit staged changes on the current branch and sync everything stacked on it.
    #[clap(alias = "ci")]
    Commit(CommitCmd),
    /// Amend the last commit of the current branch, keeping its message, and sync upstack.
    Amend(AmendCmd),
    /// Rebase branches onto their parents' current tips.
    #[clap(aliases = ["s", "restack"])]
    Sync(SyncCmd),
    /// Resume the operation that stopped on a conflict.
    #[clap(alias = "c")]
    Continue(ContinueCmd),
    /// Forget the operation that stopped on a conflict.
    Abort(AbortCmd),
    /// Push branches and open or retarget their pull requests.
    #[clap(aliases = ["p", "submit"])]
    Push(PushCmd),
    /// Move the current branch and everything stacked on it.
    #[clap(subcommand, alias = "us")]
    Upstack(UpstackCmd),
    /// Fetch, reset the trunks, and drop merged or deleted branches.
    #[clap(alias = "u")]
    Update(UpdateCmd),
    /// Delete the merged bottom branch of the current stack and restack its children.
    Land(LandCmd),
}

impl Subcommands {
    /// Run the subcommand with the given context.
    pub async fn run(self, ctx: StContext<'_>, session: &Session) -> anyhow::Result<()> {
        match self {
            Self::Log(args) => args.run(ctx),
            Self::Branch(args) => args.run(ctx, session),
            Self::Adopt(args) => args.run(ctx, session),
            Self::Commit(args) => args.run(ctx),
            Self::Amend(args) => args.run(ctx),
            Self::Sync(args) => args.run(ctx),
            Self::Continue(args) => args.run(ctx),
            Self::Abort(args) => args.run(ctx),
            Self::Push(args) => args.run(ctx, session).await,
            Self::Upstack(args) => args.run(ctx),
            Self::Update(args) => args.run(ctx, session).await,
            Self::Land(args) => args.run(ctx, session).await,
        }
    }
}

/// The part of the stack a subcommand applies to, relative to the checked out branch.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum SelectionArg {
    /// Only the checked out branch.
    Branch,
    /// Every branch below and above the checked out branch.
    #[default]
    Stack,
    /// The checked out branch and every branch above it.
    Upstack,
    /// The checked out branch and every branch below it.
    Downstack,
}

impl From<SelectionArg> for Selection {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::Branch => Selection::Branch,
            SelectionArg::Stack => Selection::Stack,
            SelectionArg::Upstack => Selection::Upstack,
            SelectionArg::Downstack => Selection::Downstack,
        }
    }
}

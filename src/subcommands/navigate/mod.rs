//! Subcommands for creating and moving between branches.

use crate::{cli::Session, ctx::StContext};
use anyhow::Result;
use clap::Subcommand;

mod checkout;
pub use checkout::CheckoutCmd;

mod relative;
pub use relative::{DownCmd, UpCmd};

use super::stack::CreateCmd;

/// The `branch` subcommands.
#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum BranchCmd {
    /// Create a new branch on top of the checked out branch.
    #[clap(aliases = ["n", "create"])]
    New(CreateCmd),
    /// Check out a child of the checked out branch.
    #[clap(alias = "u")]
    Up(UpCmd),
    /// Check out the parent of the checked out branch.
    #[clap(alias = "d")]
    Down(DownCmd),
    /// Check out a branch that is tracked with `stk`.
    #[clap(alias = "co")]
    Checkout(CheckoutCmd),
}

impl BranchCmd {
    /// Run the `branch` subcommand.
    pub fn run(self, ctx: StContext<'_>, session: &Session) -> Result<()> {
        match self {
            Self::New(args) => args.run(ctx),
            Self::Up(args) => args.run(ctx, session),
            Self::Down(args) => args.run(ctx),
            Self::Checkout(args) => args.run(ctx),
        }
    }
}

//! `branch up` and `branch down` subcommands.

use crate::{cli::Session, ctx::StContext};
use anyhow::{anyhow, Result};
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `branch up` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UpCmd;

impl UpCmd {
    /// Run the `branch up` subcommand.
    pub fn run(self, ctx: StContext<'_>, session: &Session) -> Result<()> {
        let current = ctx.repository.current_branch()?;
        let mut children = ctx.children_of(&current)?;

        let child = match children.len() {
            0 => return Err(anyhow!("`{}` has no branches stacked on it.", current)),
            1 => children.remove(0),
            _ if session.config.skip_confirm => children.remove(0),
            _ => inquire::Select::new("Select a child branch", children).prompt()?,
        };

        ctx.repository.checkout(&child)?;
        println!("Checked out `{}`.", Color::Blue.paint(&child));
        Ok(())
    }
}

/// CLI arguments for the `branch down` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct DownCmd;

impl DownCmd {
    /// Run the `branch down` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> Result<()> {
        let current = ctx.repository.current_branch()?;
        let parent = ctx
            .parent_of(&current)?
            .ok_or_else(|| anyhow!("`{}` is a trunk branch.", current))?;

        ctx.repository.checkout(&parent)?;
        println!("Checked out `{}`.", Color::Blue.paint(&parent));
        Ok(())
    }
}

//! `adopt` subcommand.

use crate::{cli::Session, ctx::StContext};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `adopt` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AdoptCmd {
    /// The branch to track.
    branch: String,
    /// The parent to stack it on. Prompts with the stack tree when omitted.
    #[arg(long, short)]
    parent: Option<String>,
}

impl AdoptCmd {
    /// Run the `adopt` subcommand.
    pub fn run(self, mut ctx: StContext<'_>, session: &Session) -> Result<()> {
        let parent = match self.parent {
            Some(parent) => parent,
            None => {
                let prompt = format!("Select the parent of `{}`", Blue.paint(&self.branch));
                inquire::Select::new(prompt.as_str(), ctx.display_branches()?)
                    .with_formatter(&|f| f.value.branch_name.clone())
                    .prompt()?
                    .branch_name
            }
        };

        ctx.adopt(&self.branch, &parent)?;
        println!(
            "Now tracking `{}` on top of `{}`.",
            Blue.paint(&self.branch),
            Blue.paint(&parent)
        );

        if session.config.change_to_adopted {
            ctx.repository.checkout(&self.branch)?;
        }
        Ok(())
    }
}

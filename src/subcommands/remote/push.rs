//! `push` subcommand.

use crate::{
    cli::Session,
    ctx::{PublishStep, ReviewAction, StContext},
    subcommands::SelectionArg,
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `push` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct PushCmd {
    /// The part of the stack to push.
    #[arg(value_enum, default_value_t = SelectionArg::Downstack)]
    selection: SelectionArg,
    /// Only push, without opening or retargeting pull requests.
    #[arg(long)]
    no_pr: bool,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    force: bool,
}

impl PushCmd {
    /// Run the `push` subcommand.
    pub async fn run(self, mut ctx: StContext<'_>, session: &Session) -> Result<()> {
        let create_reviews = !self.no_pr;
        let branches = ctx.select_current(self.selection.into())?;
        let plan = ctx.publish_plan(&branches, create_reviews)?;

        if plan.iter().all(|step| step.push.is_none() && !Self::changes_review(step)) {
            println!("Everything is already published.");
            return Ok(());
        }

        println!("About to publish:");
        plan.iter().for_each(Self::print_step);
        if !session.confirm("Continue?", self.force)? {
            return Ok(());
        }

        let reviews = session.reviews(create_reviews)?;
        let report = ctx.publish(&reviews, &branches, create_reviews).await?;
        for (branch, outcome) in report.outcomes.iter() {
            let pushed = if outcome.pushed { "pushed" } else { "unchanged" };
            match outcome.number {
                Some(number) => println!(
                    "`{}` {} @ {}",
                    Color::Green.paint(branch),
                    pushed,
                    Color::Cyan.italic().paint(reviews.pull_request_url(number))
                ),
                None => println!("`{}` {}", Color::Green.paint(branch), pushed),
            }
        }
        Ok(())
    }

    fn changes_review(step: &PublishStep) -> bool {
        matches!(
            step.review,
            ReviewAction::Create { .. } | ReviewAction::UpdateBase { .. }
        )
    }

    fn print_step(step: &PublishStep) {
        let push = match step.push {
            Some(true) => Color::Red.paint("force-push"),
            Some(false) => Color::Green.paint("push"),
            None => Color::DarkGray.paint("up to date"),
        };
        let review = match &step.review {
            ReviewAction::Create { base } => format!("open pull request into `{}`", base),
            ReviewAction::UpdateBase { number, from, to } => {
                format!("retarget #{} from `{}` to `{}`", number, from, to)
            }
            ReviewAction::Unchanged { number } => format!("#{} unchanged", number),
            ReviewAction::Skipped => String::new(),
        };
        println!("  {} {} {}", Color::Blue.paint(&step.branch), push, review);
    }
}

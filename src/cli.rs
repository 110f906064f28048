//! The CLI for `stk`.

use crate::{
    config::StConfig,
    ctx::StContext,
    errors::{StError, StResult},
    git::GitRepository,
    review::GitHubReviews,
    store::TomlStore,
    subcommands::Subcommands,
};
use anyhow::{anyhow, Result};
use clap::{
    builder::styling::{AnsiColor, Color, Style},
    ArgAction, Parser,
};
use tracing::Level;

const ABOUT: &str = "stk keeps stacks of dependent branches rebased, published, and landed.";

/// The CLI application for `stk`.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
#[command(about = ABOUT, version, styles = cli_styles())]
pub struct Cli {
    /// Verbosity level (0-4)
    #[arg(short, action = ArgAction::Count)]
    pub v: u8,
    /// The subcommand to run
    #[clap(subcommand)]
    pub subcommand: Option<Subcommands>,
}

impl Cli {
    /// Run the CLI application with the given arguments.
    pub async fn run(self) -> Result<()> {
        let repository =
            crate::git::active_repository().ok_or_else(|| anyhow!("Not in a git repository."))?;
        let config = StConfig::load(repository.workdir())?;
        let remote_url = repository
            .find_remote(&config.remote)
            .ok()
            .and_then(|remote| remote.url().map(ToOwned::to_owned));

        let mut store = TomlStore::open(&repository)?;
        tracing::debug!(path = %store.path().display(), "Opened store");
        let git = GitRepository::new(repository, config.remote.clone());
        let ctx = StContext::new(&git, &mut store, config.trunks.clone());
        let session = Session { config, remote_url };

        match self.subcommand {
            Some(subcommand) => subcommand.run(ctx, &session).await?,
            None => ctx.print_tree()?,
        }
        Ok(())
    }

    /// Initializes the tracing subscriber
    ///
    /// # Returns
    /// - `Result<()>` - Ok if successful, Err otherwise.
    pub(crate) fn init_tracing_subscriber(self) -> Result<Self> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match self.v {
                0 => Level::ERROR,
                1 => Level::WARN,
                2 => Level::INFO,
                3 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .finish();

        tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))?;

        Ok(self)
    }
}

/// Everything a subcommand needs besides the [StContext].
#[derive(Debug)]
pub struct Session {
    /// The resolved configuration.
    pub config: StConfig,
    /// The URL of the configured remote, if it exists.
    remote_url: Option<String>,
}

impl Session {
    /// Builds the GitHub client for the configured remote.
    ///
    /// With `authenticated` unset, a missing token falls back to an anonymous client.
    pub fn reviews(&self, authenticated: bool) -> StResult<GitHubReviews> {
        let remote_url = self.remote_url.as_deref().ok_or_else(|| {
            StError::Config(format!("Remote `{}` does not exist.", self.config.remote))
        })?;
        let token = if authenticated {
            Some(self.config.require_token()?)
        } else {
            self.config.github_token.clone()
        };
        GitHubReviews::from_remote_url(token, remote_url)
    }

    /// Asks the user to confirm `message`, unless prompts are skipped by `force` or the config.
    pub fn confirm(&self, message: &str, force: bool) -> StResult<bool> {
        if force || self.config.skip_confirm {
            return Ok(true);
        }
        Ok(inquire::Confirm::new(message).with_default(false).prompt()?)
    }
}

/// Styles for the CLI application.
const fn cli_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

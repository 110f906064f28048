//! Configuration for the `stk` application.

use crate::{
    constants::{DEFAULT_REMOTE, DEFAULT_TRUNKS, STK_CFG_FILE_NAME},
    errors::{StError, StResult},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured GitHub token.
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// The resolved configuration of the `stk` application.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StConfig {
    /// GitHub personal access token used to manage pull requests.
    pub github_token: Option<String>,
    /// The remote that branches are pushed to and fetched from.
    pub remote: String,
    /// The names of the trunk branches.
    pub trunks: Vec<String>,
    /// Skip confirmation prompts.
    pub skip_confirm: bool,
    /// Check out a branch after adopting it.
    pub change_to_adopted: bool,
}

impl Default for StConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            remote: DEFAULT_REMOTE.to_string(),
            trunks: DEFAULT_TRUNKS.iter().map(|t| t.to_string()).collect(),
            skip_confirm: false,
            change_to_adopted: false,
        }
    }
}

/// A single configuration file. Every key is optional so that files can be layered.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub github_token: Option<String>,
    pub remote: Option<String>,
    pub trunks: Option<Vec<String>>,
    pub skip_confirm: Option<bool>,
    pub change_to_adopted: Option<bool>,
}

impl ConfigFile {
    /// Reads the configuration file at `path`. A missing file reads as empty.
    pub fn read(path: &Path) -> StResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| StError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

impl StConfig {
    /// Loads the configuration from the home directory, overlaid by the repository's own file
    /// and the environment.
    pub fn load(workdir: Option<&Path>) -> StResult<Self> {
        let mut layers = Vec::new();
        if let Some(home) = home_config_path() {
            layers.push(ConfigFile::read(&home)?);
        }
        if let Some(workdir) = workdir {
            layers.push(ConfigFile::read(&workdir.join(STK_CFG_FILE_NAME))?);
        }

        let mut config = layers
            .into_iter()
            .fold(Self::default(), |config, layer| config.overlay(layer));
        if let Some(token) = std::env::var(GITHUB_TOKEN_ENV).ok().filter(|t| !t.is_empty()) {
            config.github_token = Some(token);
        }

        tracing::debug!(remote = %config.remote, trunks = ?config.trunks, "Loaded configuration");
        Ok(config)
    }

    /// Applies every key set in `layer` on top of `self`.
    pub fn overlay(self, layer: ConfigFile) -> Self {
        Self {
            github_token: layer.github_token.or(self.github_token),
            remote: layer.remote.unwrap_or(self.remote),
            trunks: layer.trunks.unwrap_or(self.trunks),
            skip_confirm: layer.skip_confirm.unwrap_or(self.skip_confirm),
            change_to_adopted: layer.change_to_adopted.unwrap_or(self.change_to_adopted),
        }
    }

    /// Returns the GitHub token, or an error explaining how to provide one.
    pub fn require_token(&self) -> StResult<String> {
        self.github_token.clone().ok_or_else(|| {
            StError::Config(format!(
                "No GitHub token configured. Set `github-token` in ~/{} or export {}.",
                STK_CFG_FILE_NAME, GITHUB_TOKEN_ENV
            ))
        })
    }
}

/// Returns the path of the configuration file in the user's home directory.
pub fn home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(STK_CFG_FILE_NAME))
}

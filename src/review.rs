//! Pull request operations for the `stk` application.

use crate::errors::{StError, StResult};
use async_trait::async_trait;
use octocrab::{models::IssueState, Octocrab};

/// The state of a pull request on the remote platform.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReviewStatus {
    /// Open for review.
    Open,
    /// Merged into its base.
    Merged,
    /// Closed without merging.
    Closed,
}

/// The code-review operations `stk` relies on.
#[async_trait]
pub trait ReviewGateway: Send + Sync {
    /// Opens a pull request merging `branch` into `base`, returning its number.
    async fn create(&self, branch: &str, base: &str, title: &str) -> StResult<u64>;

    /// Points an existing pull request at a new base branch.
    async fn update_base(&self, number: u64, base: &str) -> StResult<()>;

    /// Returns the state of an existing pull request.
    async fn status(&self, number: u64) -> StResult<ReviewStatus>;

    /// Asks `reviewers` to review an existing pull request.
    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> StResult<()>;
}

/// A [ReviewGateway] for repositories hosted on GitHub.
pub struct GitHubReviews {
    /// The GitHub API client.
    client: Octocrab,
    /// The owner of the repository.
    owner: String,
    /// The name of the repository.
    repo: String,
}

impl GitHubReviews {
    /// Creates a new [GitHubReviews] client for `owner/repo`.
    ///
    /// Without a `token` the client is anonymous and can only read public repositories.
    pub fn new(token: Option<String>, owner: String, repo: String) -> StResult<Self> {
        let client = match token {
            Some(token) => Octocrab::builder().personal_token(token).build()?,
            None => Octocrab::builder().build()?,
        };
        Ok(Self {
            client,
            owner,
            repo,
        })
    }

    /// Creates a new [GitHubReviews] client for the repository that `remote_url` points at.
    pub fn from_remote_url(token: Option<String>, remote_url: &str) -> StResult<Self> {
        let (owner, repo) = owner_and_repository(remote_url).ok_or_else(|| {
            StError::Config(format!(
                "Remote URL `{}` does not point at a GitHub repository.",
                remote_url
            ))
        })?;
        Self::new(token, owner, repo)
    }

    /// Returns the web URL of the pull request numbered `number`.
    pub fn pull_request_url(&self, number: u64) -> String {
        format!(
            "https://github.com/{}/{}/pull/{}",
            self.owner, self.repo, number
        )
    }
}

#[async_trait]
impl ReviewGateway for GitHubReviews {
    async fn create(&self, branch: &str, base: &str, title: &str) -> StResult<u64> {
        let pr_info = self
            .client
            .pulls(&self.owner, &self.repo)
            .create(title, branch, base)
            .send()
            .await?;
        tracing::info!(branch, base, number = pr_info.number, "Opened pull request");
        Ok(pr_info.number)
    }

    async fn update_base(&self, number: u64, base: &str) -> StResult<()> {
        self.client
            .pulls(&self.owner, &self.repo)
            .update(number)
            .base(base)
            .send()
            .await?;
        tracing::info!(number, base, "Updated pull request base");
        Ok(())
    }

    async fn status(&self, number: u64) -> StResult<ReviewStatus> {
        let pr_info = self
            .client
            .pulls(&self.owner, &self.repo)
            .get(number)
            .await?;

        let status = if pr_info.merged_at.is_some() {
            ReviewStatus::Merged
        } else if matches!(pr_info.state, Some(IssueState::Closed)) {
            ReviewStatus::Closed
        } else {
            ReviewStatus::Open
        };
        Ok(status)
    }

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> StResult<()> {
        self.client
            .pulls(&self.owner, &self.repo)
            .request_reviews(number, reviewers.to_vec(), Vec::<String>::new())
            .await?;
        tracing::info!(number, ?reviewers, "Requested reviewers");
        Ok(())
    }
}

/// Extracts the `(owner, repository)` pair from a GitHub remote URL.
///
/// Accepts both the `git@github.com:owner/repo.git` and `https://github.com/owner/repo` forms.
pub fn owner_and_repository(remote_url: &str) -> Option<(String, String)> {
    let path = if let Some(rest) = remote_url.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else {
        let without_scheme = remote_url.split_once("://")?.1;
        without_scheme.split_once('/')?.1
    };

    let mut parts = path.trim_end_matches('/').trim_end_matches(".git").split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    parts
        .next()
        .is_none()
        .then(|| (owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod test {
    use super::owner_and_repository;

    #[test]
    fn parses_github_remote_urls() {
        let expected = Some(("clabby".to_string(), "st".to_string()));
        assert_eq!(owner_and_repository("git@github.com:clabby/st.git"), expected);
        assert_eq!(owner_and_repository("https://github.com/clabby/st"), expected);
        assert_eq!(owner_and_repository("ssh://git@github.com/clabby/st.git"), expected);
        assert_eq!(owner_and_repository("not a url"), None);
        assert_eq!(owner_and_repository("https://github.com/clabby"), None);
    }
}

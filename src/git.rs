//! Utilities for interacting with `git` repositories for the `stk` application.

use crate::errors::{StError, StResult};
use git2::{
    build::CheckoutBuilder, BranchType, Oid, Repository, RepositoryState, ResetType,
};
use std::{
    collections::BTreeSet,
    env,
    path::Path,
    process::{Command, Output, Stdio},
};

/// Returns the repository for the current working directory, and [None] if
/// the current working directory is not within a git repository or an error
/// occurs.
pub fn active_repository() -> Option<Repository> {
    Repository::discover(env::current_dir().ok()?).ok()
}

/// The outcome of a rebase attempt.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RebaseOutcome {
    /// The rebase applied cleanly.
    Clean,
    /// The rebase stopped on a conflict and was left in progress for the user to resolve.
    Conflict,
}

/// How [RepoGateway::commit] records the staged changes.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct CommitOptions {
    /// The commit message. Without one, `git` opens the editor.
    pub message: Option<String>,
    /// Rewrite the tip commit instead of adding a new one.
    pub amend: bool,
    /// Allow a commit that changes nothing.
    pub allow_empty: bool,
    /// Keep the message of the amended commit.
    pub no_edit: bool,
}

/// The repository operations `stk` relies on. Commit identifiers are passed around in [String]
/// form so that implementations are free to choose their own object model.
pub trait RepoGateway {
    /// Returns the name of the checked out branch.
    fn current_branch(&self) -> StResult<String>;

    /// Returns the names of all local branches.
    fn list_branches(&self) -> StResult<BTreeSet<String>>;

    /// Returns the commit at the tip of the local branch `branch`.
    fn tip(&self, branch: &str) -> StResult<String>;

    /// Returns the commit at the tip of the remote copy of `branch`, if one exists.
    fn remote_tip(&self, branch: &str) -> StResult<Option<String>>;

    /// Returns the best common ancestor of two commits.
    fn merge_base(&self, a: &str, b: &str) -> StResult<String>;

    /// Returns `true` if `ancestor` is `descendant` or one of its ancestors.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> StResult<bool>;

    /// Replays the commits of `branch` after `upstream` on top of `onto`.
    fn rebase(&self, branch: &str, onto: &str, upstream: &str) -> StResult<RebaseOutcome>;

    /// Returns `true` while a rebase is waiting on the user.
    fn rebase_in_progress(&self) -> StResult<bool>;

    /// Pushes `branch` to the branch of the same name on the remote.
    fn push(&self, branch: &str, force: bool) -> StResult<()>;

    /// Fetches from the remote.
    fn fetch(&self) -> StResult<()>;

    /// Deletes the local branch `branch`.
    fn delete_branch(&self, branch: &str) -> StResult<()>;

    /// Checks out the local branch `branch`.
    fn checkout(&self, branch: &str) -> StResult<()>;

    /// Creates `branch` at the tip of the checked out branch and checks it out.
    fn create_branch(&self, branch: &str) -> StResult<()>;

    /// Moves the local branch `branch` to the tip of its remote copy.
    fn reset_to_remote(&self, branch: &str) -> StResult<()>;

    /// Returns the summary line of the commit at the tip of `branch`.
    fn commit_summary(&self, branch: &str) -> StResult<String>;

    /// Returns the message body of the commit at the tip of `branch`, without the summary line.
    fn commit_body(&self, branch: &str) -> StResult<String>;

    /// Commits the staged changes on the checked out branch.
    fn commit(&self, options: &CommitOptions) -> StResult<()>;
}

/// A [RepoGateway] backed by `libgit2`, shelling out to `git` for rebases and network operations.
pub struct GitRepository {
    /// The underlying repository.
    repository: Repository,
    /// The name of the remote to push to and fetch from.
    remote: String,
}

impl GitRepository {
    /// Creates a new [GitRepository] around `repository`, talking to `remote`.
    pub fn new(repository: Repository, remote: impl Into<String>) -> Self {
        Self {
            repository,
            remote: remote.into(),
        }
    }

    /// Returns the directory `git` subprocesses run in.
    fn workdir(&self) -> &Path {
        self.repository
            .workdir()
            .unwrap_or_else(|| self.repository.path())
    }

    /// Runs `git` with the given arguments in the repository, capturing its output.
    fn git(&self, args: &[&str]) -> StResult<Output> {
        tracing::debug!(?args, "Running git");
        Command::new("git")
            .args(args)
            .current_dir(self.workdir())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| StError::RepositoryOperation(format!("Failed to run git: {}", e)))
    }

    /// Runs `git` with the given arguments, failing if it exits unsuccessfully.
    fn git_checked(&self, args: &[&str]) -> StResult<()> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(StError::RepositoryOperation(format!(
                "`git {}` failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn branch_oid(&self, branch: &str) -> StResult<Oid> {
        let branch_ref = self
            .repository
            .find_branch(branch, BranchType::Local)
            .map_err(|_| StError::BranchNotFound(branch.to_string()))?;
        Ok(branch_ref.get().peel_to_commit()?.id())
    }
}

impl RepoGateway for GitRepository {
    fn current_branch(&self) -> StResult<String> {
        let head = self.repository.head()?;
        if !head.is_branch() {
            return Err(StError::DetachedHead);
        }
        head.shorthand()
            .map(ToOwned::to_owned)
            .ok_or(StError::DetachedHead)
    }

    fn list_branches(&self) -> StResult<BTreeSet<String>> {
        self.repository
            .branches(Some(BranchType::Local))?
            .map(|b| {
                let (b, _) = b?;
                b.name()?.map(ToOwned::to_owned).ok_or_else(|| {
                    StError::RepositoryOperation("Branch name is not valid UTF-8.".to_string())
                })
            })
            .collect()
    }

    fn tip(&self, branch: &str) -> StResult<String> {
        Ok(self.branch_oid(branch)?.to_string())
    }

    fn remote_tip(&self, branch: &str) -> StResult<Option<String>> {
        let remote_name = format!("{}/{}", self.remote, branch);
        match self.repository.find_branch(&remote_name, BranchType::Remote) {
            Ok(remote_branch) => Ok(Some(remote_branch.get().peel_to_commit()?.id().to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn merge_base(&self, a: &str, b: &str) -> StResult<String> {
        let base = self
            .repository
            .merge_base(Oid::from_str(a)?, Oid::from_str(b)?)?;
        Ok(base.to_string())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> StResult<bool> {
        let (ancestor, descendant) = (Oid::from_str(ancestor)?, Oid::from_str(descendant)?);
        Ok(ancestor == descendant
            || self.repository.graph_descendant_of(descendant, ancestor)?)
    }

    fn rebase(&self, branch: &str, onto: &str, upstream: &str) -> StResult<RebaseOutcome> {
        // `git2` does not handle conflicts the way the user expects to resolve them, so the
        // rebase is left to `git` itself.
        let output = self.git(&["rebase", "--onto", onto, upstream, branch])?;
        if output.status.success() {
            return Ok(RebaseOutcome::Clean);
        }

        if self.rebase_in_progress()? {
            Ok(RebaseOutcome::Conflict)
        } else {
            Err(StError::RepositoryOperation(format!(
                "Rebase of `{}` onto `{}` failed: {}",
                branch,
                onto,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    fn rebase_in_progress(&self) -> StResult<bool> {
        Ok(matches!(
            self.repository.state(),
            RepositoryState::Rebase
                | RepositoryState::RebaseInteractive
                | RepositoryState::RebaseMerge
                | RepositoryState::ApplyMailboxOrRebase
        ))
    }

    fn push(&self, branch: &str, force: bool) -> StResult<()> {
        let refspec = format!("{}:{}", branch, branch);
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend([self.remote.as_str(), refspec.as_str()]);
        self.git_checked(&args)
    }

    fn fetch(&self) -> StResult<()> {
        self.git_checked(&["fetch", self.remote.as_str()])
    }

    fn delete_branch(&self, branch: &str) -> StResult<()> {
        self.repository
            .find_branch(branch, BranchType::Local)?
            .delete()
            .map_err(Into::into)
    }

    fn checkout(&self, branch: &str) -> StResult<()> {
        let target = self
            .repository
            .revparse_single(&format!("refs/heads/{}", branch))?;
        self.repository
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        self.repository
            .set_head(format!("refs/heads/{}", branch).as_str())?;
        Ok(())
    }

    fn create_branch(&self, branch: &str) -> StResult<()> {
        let head_commit = self.repository.head()?.peel_to_commit()?;
        self.repository.branch(branch, &head_commit, false)?;
        self.checkout(branch)
    }

    fn reset_to_remote(&self, branch: &str) -> StResult<()> {
        let Some(remote_tip) = self.remote_tip(branch)? else {
            tracing::warn!(branch, "No remote copy to reset to");
            return Ok(());
        };
        let commit = self.repository.find_commit(Oid::from_str(&remote_tip)?)?;

        if self.current_branch().ok().as_deref() == Some(branch) {
            self.repository
                .reset(commit.as_object(), ResetType::Hard, None)?;
        } else {
            self.repository.reference(
                format!("refs/heads/{}", branch).as_str(),
                commit.id(),
                true,
                "stk: reset to remote",
            )?;
        }
        Ok(())
    }

    fn commit_summary(&self, branch: &str) -> StResult<String> {
        let commit = self.repository.find_commit(self.branch_oid(branch)?)?;
        Ok(commit.summary().unwrap_or(branch).to_string())
    }

    fn commit_body(&self, branch: &str) -> StResult<String> {
        let commit = self.repository.find_commit(self.branch_oid(branch)?)?;
        Ok(commit.body().unwrap_or_default().to_string())
    }

    fn commit(&self, options: &CommitOptions) -> StResult<()> {
        let mut args = vec!["commit"];
        if options.allow_empty {
            args.push("--allow-empty");
        }
        if options.amend {
            args.push("--amend");
            if options.no_edit {
                args.push("--no-edit");
            }
        }
        if let Some(message) = options.message.as_deref() {
            args.extend(["-m", message]);
        }

        // The editor needs the terminal, so output is not captured.
        tracing::debug!(?args, "Running git");
        let status = Command::new("git")
            .args(&args)
            .current_dir(self.workdir())
            .status()
            .map_err(|e| StError::RepositoryOperation(format!("Failed to run git: {}", e)))?;
        if !status.success() {
            return Err(StError::RepositoryOperation(format!(
                "`git {}` failed.",
                args.join(" ")
            )));
        }
        Ok(())
    }
}

//! Error types for the `stk` application.

use nu_ansi_term::Color;
use thiserror::Error;

/// The error type returned by every stack operation.
#[derive(Error, Debug)]
pub enum StError {
    /// A tracked branch names a parent that is neither tracked nor a trunk.
    #[error(
        "Branch `{}` names parent `{}`, which is neither tracked nor a trunk. Move it with `stk upstack onto` or re-track it with `stk adopt`.",
        Color::Blue.paint(.branch),
        Color::Blue.paint(.parent)
    )]
    OrphanBranch { branch: String, parent: String },
    /// Parent pointers in the store form a loop.
    #[error("Branch `{}` is part of a parent cycle.", Color::Blue.paint(.0))]
    Cycle(String),
    /// `continue` was requested with no interrupted operation on record.
    #[error("No interrupted operation to continue.")]
    NoPendingOperation,
    /// `continue` was requested while the repository is still mid-rebase.
    #[error("A rebase is still in progress. Resolve conflicts and run `git rebase --continue` first.")]
    UnresolvedConflict,
    /// The reparent target is not tracked and not a trunk.
    #[error("Target `{}` is not tracked with `stk` and is not a trunk branch.", Color::Blue.paint(.0))]
    UnknownTarget(String),
    /// The reparent target is the moved branch or one of its descendants.
    #[error("Cannot move `{}` onto `{}`: the target is upstack of the branch.", Color::Blue.paint(.branch), Color::Blue.paint(.target))]
    TargetIsUpstack { branch: String, target: String },
    /// The branch's review request has not been merged.
    #[error("The pull request for branch `{}` has not been merged.", Color::Blue.paint(.0))]
    NotMerged(String),
    /// The branch is not tracked with `stk`.
    #[error("Branch `{}` is not tracked with `stk`. Track it first with `stk adopt`.", Color::Blue.paint(.0))]
    BranchNotTracked(String),
    /// The branch is already tracked with `stk`.
    #[error("Branch `{}` is already tracked with `stk`.", Color::Blue.paint(.0))]
    BranchAlreadyTracked(String),
    /// The branch does not exist in the local repository.
    #[error("Branch `{}` does not exist in the local repository.", Color::Blue.paint(.0))]
    BranchNotFound(String),
    /// A trunk branch cannot be moved, landed, or adopted.
    #[error("`{}` is a trunk branch.", Color::Blue.paint(.0))]
    CannotMoveTrunk(String),
    /// A branch must be synced with its parent before the operation can proceed.
    #[error("Branch `{}` is not synced with its parent. Run `stk sync` first.", Color::Blue.paint(.0))]
    NeedsRestack(String),
    /// Commits go on tracked branches, never directly on a trunk.
    #[error("Do not commit directly on trunk branch `{}`.", Color::Blue.paint(.0))]
    CommitOnTrunk(String),
    /// `amend` was requested on a branch with no commits of its own.
    #[error("Branch `{}` has no commits of its own to amend.", Color::Blue.paint(.0))]
    NothingToAmend(String),
    /// `HEAD` does not point at a branch.
    #[error("Cannot operate on a detached HEAD.")]
    DetachedHead,
    /// A repository operation failed for reasons outside of `stk`'s control.
    #[error("Repository operation failed: {}", .0)]
    RepositoryOperation(String),
    /// A [git2::Error] occurred.
    #[error("libgit2 error: {}", .0)]
    Git2Error(#[from] git2::Error),
    /// An [octocrab::Error] occurred.
    #[error("GitHub error: {}", .0)]
    Review(#[from] octocrab::Error),
    /// Reading or writing the metadata store failed.
    #[error("Store error: {}", .0)]
    Store(String),
    /// The configuration could not be read.
    #[error("Configuration error: {}", .0)]
    Config(String),
    /// An [std::io::Error] occurred.
    #[error("I/O error: {}", .0)]
    Io(#[from] std::io::Error),
    /// An [inquire::InquireError] occurred.
    #[error("inquire error: {}", .0)]
    Prompt(#[from] inquire::InquireError),
}

/// A [Result] alias where the error type is [StError].
pub type StResult<T> = Result<T, StError>;

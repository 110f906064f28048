//! Drift detection for tracked branches.

use super::StContext;
use crate::{
    errors::{StError, StResult},
    store::BranchRecord,
    tree::StackGraph,
};

/// How a branch has diverged from what `stk` last recorded.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct Drift {
    /// The parent moved since the last sync and the branch does not yet sit on its new tip.
    pub parent: bool,
    /// The local tip differs from the remote tip.
    pub remote: bool,
    /// The branch is checked out.
    pub current: bool,
}

impl Drift {
    /// Renders the drift as the `!`, `~` and `*` markers shown next to a branch.
    pub fn indicator(&self) -> String {
        [
            (self.parent, '!'),
            (self.remote, '~'),
            (self.current, '*'),
        ]
        .iter()
        .filter_map(|(set, marker)| set.then_some(*marker))
        .collect()
    }
}

impl<'a> StContext<'a> {
    /// Computes the [Drift] of `branch` against the live repository.
    pub fn drift(&self, graph: &StackGraph, branch: &str) -> StResult<Drift> {
        let node = graph
            .get(branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;

        let parent = match node.record.as_ref() {
            Some(record) => self.needs_restack(branch, record)?,
            None => false,
        };
        let local_tip = self.repository.tip(branch)?;
        let remote = self.repository.remote_tip(branch)?.as_deref() != Some(local_tip.as_str());
        let current = self.repository.current_branch().ok().as_deref() == Some(branch);

        Ok(Drift {
            parent,
            remote,
            current,
        })
    }

    /// Returns `true` if `branch` must be rebased to sit on top of its parent.
    ///
    /// A parent that moved is not enough: if the branch already contains the parent's new tip,
    /// only the recorded parent commit is stale.
    pub fn needs_restack(&self, branch: &str, record: &BranchRecord) -> StResult<bool> {
        let parent_tip = self.repository.tip(&record.parent)?;
        if parent_tip == record.parent_oid {
            return Ok(false);
        }
        let branch_tip = self.repository.tip(branch)?;
        Ok(!self.repository.is_ancestor(&parent_tip, &branch_tip)?)
    }
}

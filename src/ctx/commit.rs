//! Committing on a tracked branch and carrying the change up the stack.

use super::{StContext, SyncReport};
use crate::{
    errors::{StError, StResult},
    git::CommitOptions,
    store::Operation,
};
use std::collections::BTreeSet;

/// The result of [StContext::commit].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommitReport {
    /// The branch that received the commit.
    pub branch: String,
    /// The cascade over the branch's upstack.
    pub sync: SyncReport,
}

impl<'a> StContext<'a> {
    /// Commits the staged changes on the checked out branch, then syncs its upstack.
    ///
    /// The branch must be tracked and synced with its parent. An amend additionally requires
    /// at least one commit of its own.
    pub fn commit(&mut self, options: &CommitOptions) -> StResult<CommitReport> {
        let graph = self.build_graph()?;
        let branch = self.repository.current_branch()?;

        if graph.is_trunk(&branch) {
            return Err(StError::CommitOnTrunk(branch));
        }
        let record = self
            .store
            .get(&branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.clone()))?;
        if self.needs_restack(&branch, &record)? {
            return Err(StError::NeedsRestack(branch));
        }
        if options.amend && self.repository.tip(&branch)? == record.parent_oid {
            return Err(StError::NothingToAmend(branch));
        }

        self.repository.commit(options)?;
        tracing::info!(branch = %branch, amend = options.amend, "Committed");

        let sync = self.cascade(graph.upstack(&branch), BTreeSet::new(), Operation::Sync)?;
        Ok(CommitReport { branch, sync })
    }
}

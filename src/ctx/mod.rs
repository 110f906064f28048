//! The in-memory context of the `stk` application.

use crate::{
    errors::{StError, StResult},
    git::RepoGateway,
    store::MetadataStore,
    tree::StackGraph,
};
use std::collections::BTreeSet;

mod actions;
mod commit;
mod drift;
mod fmt;
mod land;
mod publish;
mod restack;
mod sync;

pub use commit::CommitReport;
pub use publish::{PublishStep, ReviewAction};
pub use sync::{SyncOutcome, SyncReport};

/// Which part of the forest an operation applies to, relative to a branch.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Selection {
    /// Only the branch itself.
    Branch,
    /// The branch, everything beneath it down to the trunk, and everything stacked on top of it.
    Stack,
    /// The branch and everything stacked on top of it.
    Upstack,
    /// The branch and everything beneath it down to the trunk.
    Downstack,
}

/// Resolves a [Selection] relative to `branch` into an ordered list of tracked branches.
///
/// Parents always precede their children and siblings are listed oldest first. Trunks are never
/// part of the result.
pub fn select(graph: &StackGraph, branch: &str, selection: Selection) -> StResult<Vec<String>> {
    if graph.get(branch).is_none() {
        return Err(StError::BranchNotTracked(branch.to_string()));
    }

    let branches = match selection {
        Selection::Branch => vec![branch.to_string()],
        Selection::Upstack => graph.upstack(branch),
        Selection::Downstack => graph.downstack(branch),
        Selection::Stack => {
            let mut stack = graph.downstack(branch);
            stack.pop();
            stack.extend(graph.upstack(branch));
            stack
        }
    };

    Ok(branches
        .into_iter()
        .filter(|name| graph.is_tracked(name))
        .collect())
}

/// The in-memory context of the `stk` application.
///
/// Holds the collaborators every operation works through. Nothing is cached between operations:
/// the graph is rebuilt from the store and the repository each time it is needed.
pub struct StContext<'a> {
    /// The repository the stacks live in.
    pub repository: &'a dyn RepoGateway,
    /// The persisted stack metadata.
    pub store: &'a mut dyn MetadataStore,
    /// The configured trunk branch names.
    configured_trunks: BTreeSet<String>,
}

impl<'a> StContext<'a> {
    /// Creates a new [StContext] over the given repository and store.
    pub fn new(
        repository: &'a dyn RepoGateway,
        store: &'a mut dyn MetadataStore,
        trunks: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            repository,
            store,
            configured_trunks: trunks.into_iter().collect(),
        }
    }

    /// Returns the names treated as stack bottoms: the configured trunks plus promoted branches.
    pub fn trunk_names(&self) -> BTreeSet<String> {
        let mut names = self.configured_trunks.clone();
        names.extend(self.store.bottoms());
        names
    }

    /// Builds the [StackGraph] from the current store contents and local branches.
    pub fn build_graph(&self) -> StResult<StackGraph> {
        let local_branches = self.repository.list_branches()?;
        StackGraph::build(&self.store.list(), &local_branches, &self.trunk_names())
    }

    /// Resolves `selection` relative to the checked out branch.
    pub fn select_current(&self, selection: Selection) -> StResult<Vec<String>> {
        let graph = self.build_graph()?;
        let current = self.repository.current_branch()?;
        select(&graph, &current, selection)
    }
}

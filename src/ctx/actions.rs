//! Stack-editing actions that only touch the store and local refs.

use super::StContext;
use crate::{
    errors::{StError, StResult},
    store::BranchRecord,
};

impl<'a> StContext<'a> {
    /// Creates `name` on top of the checked out branch, tracks it, and checks it out.
    pub fn create_branch(&mut self, name: &str) -> StResult<BranchRecord> {
        let graph = self.build_graph()?;
        let parent = self.repository.current_branch()?;

        if graph.get(name).is_some() {
            return Err(StError::BranchAlreadyTracked(name.to_string()));
        }
        if self.repository.list_branches()?.contains(name) {
            return Err(StError::RepositoryOperation(format!(
                "Branch `{}` already exists. Use `adopt` to track it.",
                name
            )));
        }
        if graph.get(&parent).is_none() {
            return Err(StError::BranchNotTracked(parent));
        }

        let parent_tip = self.repository.tip(&parent)?;
        self.repository.create_branch(name)?;

        let record = BranchRecord::new(parent, parent_tip, self.store.next_seq());
        self.store.set(name, record.clone())?;
        tracing::info!(branch = name, parent = %record.parent, "Created branch");
        Ok(record)
    }

    /// Starts tracking an existing local branch under `parent`.
    ///
    /// The branch's own commits are taken to start at its merge base with `parent`.
    pub fn adopt(&mut self, branch: &str, parent: &str) -> StResult<BranchRecord> {
        let graph = self.build_graph()?;

        if !self.repository.list_branches()?.contains(branch) {
            return Err(StError::BranchNotFound(branch.to_string()));
        }
        if graph.is_trunk(branch) {
            return Err(StError::CannotMoveTrunk(branch.to_string()));
        }
        if graph.is_tracked(branch) {
            return Err(StError::BranchAlreadyTracked(branch.to_string()));
        }
        if graph.get(parent).is_none() {
            return Err(StError::UnknownTarget(parent.to_string()));
        }

        let merge_base = self
            .repository
            .merge_base(&self.repository.tip(parent)?, &self.repository.tip(branch)?)?;
        let record = BranchRecord::new(parent, merge_base, self.store.next_seq());
        self.store.set(branch, record.clone())?;
        tracing::info!(branch, parent, "Adopted branch");
        Ok(record)
    }

    /// Stops tracking `branch` and treats it as a trunk. Its children stay stacked on it.
    pub fn make_bottom(&mut self, branch: &str) -> StResult<BranchRecord> {
        let graph = self.build_graph()?;
        if graph.is_trunk(branch) {
            return Err(StError::CannotMoveTrunk(branch.to_string()));
        }

        let record = self
            .store
            .remove(branch)?
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;
        self.store.add_bottom(branch)?;
        tracing::info!(branch, "Promoted branch to stack bottom");
        Ok(record)
    }

    /// Returns the branches stacked directly on `branch`, oldest first.
    pub fn children_of(&self, branch: &str) -> StResult<Vec<String>> {
        let graph = self.build_graph()?;
        graph
            .get(branch)
            .map(|node| node.children.clone())
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))
    }

    /// Returns the parent of `branch`, or [None] if it is a trunk.
    pub fn parent_of(&self, branch: &str) -> StResult<Option<String>> {
        let graph = self.build_graph()?;
        graph
            .get(branch)
            .map(|node| node.parent.clone())
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))
    }
}

//! Moving branches between parents, and bringing the trunks up to date with the remote.

use super::{SyncReport, StContext};
use crate::{
    errors::{StError, StResult},
    review::{ReviewGateway, ReviewStatus},
    store::{BranchRecord, Operation},
    tree::StackGraph,
};
use std::collections::{BTreeMap, BTreeSet};

/// The result of [StContext::reparent].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReparentReport {
    /// The parent the branch was moved away from.
    pub previous_parent: String,
    /// The cascade over the moved branch and its upstack.
    pub sync: SyncReport,
}

/// The result of [StContext::update_trunk].
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct UpdateReport {
    /// Trunks that were reset to their remote tips.
    pub reset: Vec<String>,
    /// Merged branches whose local copies were deleted.
    pub deleted: Vec<String>,
    /// Branches moved onto their nearest surviving ancestor, with the new parent.
    pub reparented: Vec<(String, String)>,
    /// Records dropped because their branch no longer exists.
    pub removed: Vec<String>,
    /// The cascade over the upstacks of the reparented branches.
    pub sync: SyncReport,
}

/// How the store must change to forget branches that no longer exist locally.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct CollapsePlan {
    /// Surviving branches and the nearest surviving ancestor they move onto.
    pub reparent: BTreeMap<String, String>,
    /// Records whose branch is gone.
    pub remove: Vec<String>,
}

impl CollapsePlan {
    /// Returns `true` if the store is already consistent with the local branches.
    pub fn is_empty(&self) -> bool {
        self.reparent.is_empty() && self.remove.is_empty()
    }

    /// Applies the plan to a copy of `records`.
    pub fn apply(
        &self,
        records: &BTreeMap<String, BranchRecord>,
    ) -> BTreeMap<String, BranchRecord> {
        records
            .iter()
            .filter(|(name, _)| !self.remove.contains(name))
            .map(|(name, record)| {
                let mut record = record.clone();
                if let Some(parent) = self.reparent.get(name) {
                    record.parent = parent.clone();
                }
                (name.clone(), record)
            })
            .collect()
    }
}

/// Plans the removal of every record whose branch no longer exists.
///
/// A surviving branch whose parent is gone moves onto the nearest surviving ancestor, walking
/// through any number of missing branches. Chains that never reach a surviving branch or an
/// existing trunk are left alone so that building the graph reports them.
pub fn collapse_plan(
    records: &BTreeMap<String, BranchRecord>,
    local_branches: &BTreeSet<String>,
    trunk_names: &BTreeSet<String>,
) -> CollapsePlan {
    let missing = |name: &str| records.contains_key(name) && !local_branches.contains(name);
    let resolves = |name: &str| {
        local_branches.contains(name)
            && (trunk_names.contains(name) || records.contains_key(name))
    };

    let mut plan = CollapsePlan::default();
    for (name, record) in records {
        if trunk_names.contains(name) {
            continue;
        }
        if !local_branches.contains(name) {
            plan.remove.push(name.clone());
            continue;
        }

        let mut parent = record.parent.as_str();
        let mut hops = 0;
        while missing(parent) && hops <= records.len() {
            parent = records[parent].parent.as_str();
            hops += 1;
        }
        if parent != record.parent && resolves(parent) {
            plan.reparent.insert(name.clone(), parent.to_string());
        }
    }
    plan
}

impl<'a> StContext<'a> {
    /// Moves `branch` and its upstack onto `target`.
    ///
    /// The branch is always rebased, even if it already contains `target`'s tip, so that commits
    /// from its previous parent are dropped.
    pub fn reparent(&mut self, branch: &str, target: &str) -> StResult<ReparentReport> {
        let graph = self.build_graph()?;

        if graph.is_trunk(branch) {
            return Err(StError::CannotMoveTrunk(branch.to_string()));
        }
        if !graph.is_tracked(branch) {
            return Err(StError::BranchNotTracked(branch.to_string()));
        }
        if graph.get(target).is_none() {
            return Err(StError::UnknownTarget(target.to_string()));
        }
        let upstack = graph.upstack(branch);
        if upstack.iter().any(|b| b == target) {
            return Err(StError::TargetIsUpstack {
                branch: branch.to_string(),
                target: target.to_string(),
            });
        }

        // The recorded parent tip still marks where the branch's own commits begin.
        let mut record = self
            .store
            .get(branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;
        let previous_parent = std::mem::replace(&mut record.parent, target.to_string());
        self.store.set(branch, record)?;
        tracing::info!(branch, from = %previous_parent, to = target, "Moved branch");

        let sync = self.cascade(
            upstack,
            BTreeSet::from([branch.to_string()]),
            Operation::Reparent {
                branch: branch.to_string(),
                target: target.to_string(),
            },
        )?;
        Ok(ReparentReport {
            previous_parent,
            sync,
        })
    }

    /// Fetches, fast-forwards the trunks, drops merged and deleted branches and restacks what
    /// was stacked on them.
    pub async fn update_trunk(&mut self, reviews: &dyn ReviewGateway) -> StResult<UpdateReport> {
        let mut report = UpdateReport::default();

        self.repository.fetch()?;
        let local_branches = self.repository.list_branches()?;
        for trunk in self.configured_trunks.iter() {
            if local_branches.contains(trunk) && self.repository.remote_tip(trunk)?.is_some() {
                self.repository.reset_to_remote(trunk)?;
                report.reset.push(trunk.clone());
            }
        }

        // Bottom branches whose pull request merged are no longer needed locally. Every status is
        // read before anything is deleted.
        let trunk_names = self.trunk_names();
        let records = self.store.list();
        let mut merged = Vec::new();
        for (name, record) in records.iter() {
            let Some(review) = record.review.as_ref() else {
                continue;
            };
            if !trunk_names.contains(&record.parent) || !local_branches.contains(name) {
                continue;
            }
            if reviews.status(review.number).await? == ReviewStatus::Merged {
                merged.push((name.clone(), record.parent.clone(), review.number));
            }
        }

        // Plan the collapse as if the merged branches were already gone, and check that the
        // result still forms a forest before deleting anything.
        let surviving = local_branches
            .iter()
            .filter(|branch| !merged.iter().any(|(name, _, _)| name == *branch))
            .cloned()
            .collect::<BTreeSet<_>>();
        let mut plan = collapse_plan(&records, &surviving, &trunk_names);
        if plan.is_empty() {
            tracing::debug!("No deleted branches to collapse");
        }
        StackGraph::build(&plan.apply(&records), &surviving, &trunk_names)?;

        for (name, parent, number) in merged {
            if self.repository.current_branch().ok().as_deref() == Some(name.as_str()) {
                self.repository.checkout(&parent)?;
            }
            self.repository.delete_branch(&name)?;
            tracing::info!(branch = %name, number, "Deleted merged branch");
            report.deleted.push(name.clone());

            // The store follows the deletion before anything else can fail.
            let children = plan
                .reparent
                .iter()
                .filter(|(child, _)| records.get(*child).is_some_and(|r| r.parent == name))
                .map(|(child, target)| (child.clone(), target.clone()))
                .collect::<Vec<_>>();
            for (child, target) in children {
                plan.reparent.remove(&child);
                self.collapse_onto(&child, &target, &mut report)?;
            }
            plan.remove.retain(|branch| branch != &name);
            self.forget(&name, &mut report)?;
        }

        for (branch, parent) in std::mem::take(&mut plan.reparent) {
            self.collapse_onto(&branch, &parent, &mut report)?;
        }
        for branch in std::mem::take(&mut plan.remove) {
            self.forget(&branch, &mut report)?;
        }

        let graph = self.build_graph()?;
        let moved = report
            .reparented
            .iter()
            .flat_map(|(branch, _)| graph.upstack(branch))
            .collect::<BTreeSet<_>>();
        let order = graph
            .branches()
            .into_iter()
            .filter(|branch| moved.contains(branch))
            .collect::<Vec<_>>();
        if !order.is_empty() {
            // Moved branches still carry their old parent's commits, which the rebase must drop.
            let forced = report.reparented.iter().map(|(b, _)| b.clone()).collect();
            report.sync = self.cascade(order, forced, Operation::Update)?;
        }

        Ok(report)
    }

    /// Moves the record of `branch` onto `parent`, keeping its recorded parent tip.
    fn collapse_onto(
        &mut self,
        branch: &str,
        parent: &str,
        report: &mut UpdateReport,
    ) -> StResult<()> {
        if let Some(mut record) = self.store.get(branch) {
            record.parent = parent.to_string();
            self.store.set(branch, record)?;
            tracing::info!(branch, parent, "Collapsed onto surviving ancestor");
            report.reparented.push((branch.to_string(), parent.to_string()));
        }
        Ok(())
    }

    /// Drops the record of a branch that no longer exists.
    fn forget(&mut self, branch: &str, report: &mut UpdateReport) -> StResult<()> {
        self.store.remove(branch)?;
        tracing::debug!(branch, "Removed record of deleted branch");
        report.removed.push(branch.to_string());
        Ok(())
    }
}

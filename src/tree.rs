//! In-memory forest of tracked branches, rebuilt from the metadata store on every operation.

use crate::{
    errors::{StError, StResult},
    store::BranchRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An n-nary forest of branches, represented as a flat data structure.
///
/// By itself, [StackGraph] has no context of its relationship with the local repository. For
/// this functionality, [StContext] holds onto both the store and the repository.
///
/// [StContext]: crate::ctx::StContext
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct StackGraph {
    /// The trunk branches rooting the forest, in name order.
    pub trunks: Vec<String>,
    /// A map of branch names to [GraphNode]s, trunks included.
    pub branches: HashMap<String, GraphNode>,
}

/// A branch within the [StackGraph].
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct GraphNode {
    /// The branch name.
    pub name: String,
    /// The name of the parent branch.
    ///
    /// [None] if the branch is a trunk.
    pub parent: Option<String>,
    /// The names of the child branches, oldest first.
    pub children: Vec<String>,
    /// The stored record of the branch.
    ///
    /// [None] if the branch is a trunk.
    pub record: Option<BranchRecord>,
}

impl StackGraph {
    /// Builds the forest from the stored records.
    ///
    /// ## Takes
    /// - `records` - The tracked branches and their records.
    /// - `local_branches` - The branches that exist in the local repository.
    /// - `trunk_names` - The names that are treated as stack bottoms.
    ///
    /// ## Returns
    /// - `Ok(graph)` - Every record resolves to an existing branch with a resolvable parent.
    /// - `Err(_)` - A record is orphaned, refers to a deleted branch, or is part of a cycle.
    pub fn build(
        records: &BTreeMap<String, BranchRecord>,
        local_branches: &BTreeSet<String>,
        trunk_names: &BTreeSet<String>,
    ) -> StResult<Self> {
        let trunks = trunk_names
            .iter()
            .filter(|name| local_branches.contains(*name))
            .cloned()
            .collect::<Vec<_>>();

        let mut branches = trunks
            .iter()
            .map(|name| {
                let node = GraphNode {
                    name: name.clone(),
                    ..Default::default()
                };
                (name.clone(), node)
            })
            .collect::<HashMap<_, _>>();

        for (name, record) in records {
            if trunk_names.contains(name) {
                tracing::warn!(branch = %name, "Ignoring stored record for a trunk branch");
                continue;
            }
            if !local_branches.contains(name) {
                return Err(StError::BranchNotFound(name.clone()));
            }
            let parent_resolves = (records.contains_key(&record.parent)
                && !trunk_names.contains(&record.parent))
                || trunks.contains(&record.parent);
            if !parent_resolves {
                return Err(StError::OrphanBranch {
                    branch: name.clone(),
                    parent: record.parent.clone(),
                });
            }

            branches.insert(
                name.clone(),
                GraphNode {
                    name: name.clone(),
                    parent: Some(record.parent.clone()),
                    children: Vec::new(),
                    record: Some(record.clone()),
                },
            );
        }

        // Register every branch with its parent, oldest first.
        let mut by_age = branches
            .values()
            .filter_map(|node| {
                let seq = node.record.as_ref()?.seq;
                Some((seq, node.name.clone(), node.parent.clone()?))
            })
            .collect::<Vec<_>>();
        by_age.sort();
        for (_, name, parent) in by_age {
            if let Some(parent) = branches.get_mut(&parent) {
                parent.children.push(name);
            }
        }

        let graph = Self { trunks, branches };

        // Anything not reachable from a trunk must be caught in a parent cycle.
        let reachable = graph.branches();
        if reachable.len() != graph.branches.len() {
            let reachable = reachable.into_iter().collect::<BTreeSet<_>>();
            let mut stranded = graph
                .branches
                .keys()
                .filter(|name| !reachable.contains(*name))
                .collect::<Vec<_>>();
            stranded.sort();
            return Err(StError::Cycle(stranded[0].clone()));
        }

        Ok(graph)
    }

    /// Gets a branch by name from the stack graph.
    ///
    /// ## Returns
    /// - `Some(branch)` - The branch.
    /// - `None` - The branch by the name of `branch_name` was not found.
    pub fn get(&self, branch_name: &str) -> Option<&GraphNode> {
        self.branches.get(branch_name)
    }

    /// Returns `true` if `branch_name` is a trunk of the forest.
    pub fn is_trunk(&self, branch_name: &str) -> bool {
        self.trunks.iter().any(|t| t == branch_name)
    }

    /// Returns `true` if `branch_name` is tracked (not a trunk).
    pub fn is_tracked(&self, branch_name: &str) -> bool {
        self.get(branch_name)
            .is_some_and(|node| node.record.is_some())
    }

    /// Returns every branch in the forest, trunks included. Children are guaranteed to be
    /// listed after their parents.
    pub fn branches(&self) -> Vec<String> {
        let mut branch_names = Vec::new();
        self.trunks
            .iter()
            .for_each(|trunk| self.fill_branches(trunk, &mut branch_names));
        branch_names
    }

    /// Returns `branch_name` and every branch stacked on top of it, parents first.
    pub fn upstack(&self, branch_name: &str) -> Vec<String> {
        let mut branch_names = Vec::new();
        self.fill_branches(branch_name, &mut branch_names);
        branch_names
    }

    /// Returns the path from the trunk down to `branch_name`, inclusive, trunk first.
    pub fn downstack(&self, branch_name: &str) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = self.get(branch_name);
        while let Some(node) = cursor {
            path.push(node.name.clone());
            cursor = node.parent.as_deref().and_then(|p| self.get(p));
        }
        path.reverse();
        path
    }

    /// Returns the bottom-most tracked branch beneath `branch_name`, the one whose parent is a
    /// trunk.
    ///
    /// [None] if `branch_name` is a trunk or not part of the graph.
    pub fn bottom_of(&self, branch_name: &str) -> Option<&GraphNode> {
        self.downstack(branch_name)
            .get(1)
            .and_then(|name| self.get(name))
    }

    /// Fills a vector with `name` and its descendants, parents before children and siblings
    /// oldest first.
    fn fill_branches(&self, name: &str, branch_names: &mut Vec<String>) {
        let Some(current) = self.branches.get(name) else {
            return;
        };

        branch_names.push(current.name.clone());
        current
            .children
            .iter()
            .for_each(|child| self.fill_branches(child, branch_names))
    }
}

#[cfg(test)]
mod test {
    use super::StackGraph;
    use crate::{errors::StError, store::BranchRecord};
    use std::collections::{BTreeMap, BTreeSet};

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn records(entries: &[(&str, &str, u64)]) -> BTreeMap<String, BranchRecord> {
        entries
            .iter()
            .map(|(name, parent, seq)| (name.to_string(), BranchRecord::new(*parent, "", *seq)))
            .collect()
    }

    #[test]
    fn builds_forest_with_siblings_oldest_first() {
        let records = records(&[("a", "main", 0), ("c", "a", 3), ("b", "a", 1), ("d", "b", 2)]);
        let graph = StackGraph::build(
            &records,
            &set(&["main", "a", "b", "c", "d"]),
            &set(&["main", "master"]),
        )
        .unwrap();

        assert_eq!(graph.trunks, vec!["main".to_string()]);
        assert_eq!(graph.get("a").unwrap().children, vec!["b", "c"]);
        assert_eq!(graph.branches(), vec!["main", "a", "b", "d", "c"]);
        assert_eq!(graph.upstack("b"), vec!["b", "d"]);
        assert_eq!(graph.downstack("d"), vec!["main", "a", "b", "d"]);
        assert_eq!(graph.bottom_of("d").unwrap().name, "a");
        assert!(graph.bottom_of("main").is_none());
        assert!(graph.is_trunk("main") && !graph.is_tracked("main"));
        assert!(graph.is_tracked("c"));
    }

    #[test]
    fn unresolvable_parent_is_orphan() {
        let records = records(&[("a", "gone", 0)]);
        let err = StackGraph::build(&records, &set(&["main", "a"]), &set(&["main"])).unwrap_err();
        assert!(matches!(
            err,
            StError::OrphanBranch { branch, parent } if branch == "a" && parent == "gone"
        ));
    }

    #[test]
    fn trunk_missing_locally_does_not_resolve() {
        let records = records(&[("a", "master", 0)]);
        let local = set(&["main", "a"]);
        let err = StackGraph::build(&records, &local, &set(&["main", "master"])).unwrap_err();
        assert!(err.to_string().contains("stk upstack onto"));
        assert!(matches!(err, StError::OrphanBranch { .. }));
    }

    #[test]
    fn deleted_branch_is_reported() {
        let records = records(&[("a", "main", 0)]);
        let err = StackGraph::build(&records, &set(&["main"]), &set(&["main"])).unwrap_err();
        assert!(matches!(err, StError::BranchNotFound(name) if name == "a"));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let records = records(&[("a", "main", 0), ("b", "c", 1), ("c", "b", 2)]);
        let err = StackGraph::build(&records, &set(&["main", "a", "b", "c"]), &set(&["main"]))
            .unwrap_err();
        assert!(matches!(err, StError::Cycle(name) if name == "b"));
    }
}

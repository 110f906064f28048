//! Cascading rebases over an ordered list of branches, with a resumable checkpoint.

use super::{select, Selection, StContext};
use crate::{
    errors::{StError, StResult},
    git::RebaseOutcome,
    store::{Checkpoint, Operation},
};
use std::collections::BTreeSet;

/// What happened to a single branch during a cascade.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SyncOutcome {
    /// The parent has not moved since the last sync.
    AlreadySynced { parent: String },
    /// The branch already sat on the parent's tip; only the record was updated.
    Recorded { parent: String },
    /// The branch was rebased onto its parent's tip.
    Rebased { onto: String },
    /// The rebase onto the parent stopped on a conflict. The cascade halted here.
    Conflict { onto: String },
}

/// The result of a cascade, in processing order.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct SyncReport {
    /// Every branch that was visited and what happened to it.
    pub outcomes: Vec<(String, SyncOutcome)>,
    /// `true` if the cascade stopped on a conflict and a checkpoint was written.
    pub halted: bool,
}

impl SyncReport {
    /// Returns the branches that were rebased.
    pub fn rebased(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, SyncOutcome::Rebased { .. }))
            .map(|(branch, _)| branch.as_str())
            .collect()
    }

    /// Returns the branch the cascade halted on, if any.
    pub fn conflicted(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|(branch, outcome)| {
            matches!(outcome, SyncOutcome::Conflict { .. }).then_some(branch.as_str())
        })
    }
}

impl<'a> StContext<'a> {
    /// Rebases the selected part of the current branch's stack onto its parents.
    pub fn sync(&mut self, selection: Selection) -> StResult<SyncReport> {
        let graph = self.build_graph()?;
        let current = self.repository.current_branch()?;
        let order = select(&graph, &current, selection)?;
        self.cascade(order, BTreeSet::new(), Operation::Sync)
    }

    /// Resumes the cascade recorded in the checkpoint, once the user resolved the conflict.
    pub fn continue_pending(&mut self) -> StResult<SyncReport> {
        let checkpoint = self.store.checkpoint().ok_or(StError::NoPendingOperation)?;
        if self.repository.rebase_in_progress()? {
            return Err(StError::UnresolvedConflict);
        }

        tracing::info!(
            remaining = checkpoint.remaining.len(),
            operation = ?checkpoint.operation,
            "Resuming interrupted operation"
        );
        let forced = checkpoint.forced.iter().cloned().collect();
        self.run_cascade(
            checkpoint.remaining,
            forced,
            checkpoint.operation,
            checkpoint.original_branch,
        )
    }

    /// Drops the checkpoint of an interrupted operation without resuming it.
    pub fn discard_pending(&mut self) -> StResult<Checkpoint> {
        let checkpoint = self.store.checkpoint().ok_or(StError::NoPendingOperation)?;
        self.store.set_checkpoint(None)?;
        tracing::info!(operation = ?checkpoint.operation, "Discarded interrupted operation");
        Ok(checkpoint)
    }

    /// Runs a cascade over `order` from the currently checked out branch.
    ///
    /// Branches in `forced` are rebased on their first attempt even when they look synced.
    pub(crate) fn cascade(
        &mut self,
        order: Vec<String>,
        forced: BTreeSet<String>,
        operation: Operation,
    ) -> StResult<SyncReport> {
        // Fail on orphans and cycles before touching anything.
        self.build_graph()?;
        let original_branch = self.repository.current_branch()?;
        self.run_cascade(order, forced, operation, original_branch)
    }

    fn run_cascade(
        &mut self,
        order: Vec<String>,
        mut forced: BTreeSet<String>,
        operation: Operation,
        original_branch: String,
    ) -> StResult<SyncReport> {
        let mut report = SyncReport::default();

        for (i, branch) in order.iter().enumerate() {
            let outcome = self.sync_branch(branch, forced.remove(branch))?;
            let conflicted = matches!(outcome, SyncOutcome::Conflict { .. });
            report.outcomes.push((branch.clone(), outcome));

            if conflicted {
                let rest = &order[i + 1..];
                let checkpoint = Checkpoint {
                    original_branch,
                    remaining: order[i..].to_vec(),
                    forced: rest.iter().filter(|b| forced.contains(*b)).cloned().collect(),
                    operation,
                };
                self.store.set_checkpoint(Some(checkpoint))?;
                tracing::warn!(branch = %branch, "Rebase stopped on a conflict");
                report.halted = true;
                return Ok(report);
            }
        }

        self.store.set_checkpoint(None)?;
        if self.repository.current_branch().ok().as_deref() != Some(original_branch.as_str()) {
            self.repository.checkout(&original_branch)?;
        }
        Ok(report)
    }

    /// Brings a single branch up to date with its parent's tip.
    fn sync_branch(&mut self, branch: &str, forced: bool) -> StResult<SyncOutcome> {
        let mut record = self
            .store
            .get(branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;
        let parent = record.parent.clone();
        let parent_tip = self.repository.tip(&parent)?;

        if !forced {
            if parent_tip == record.parent_oid {
                tracing::debug!(branch, %parent, "Already synced");
                return Ok(SyncOutcome::AlreadySynced { parent });
            }
            let branch_tip = self.repository.tip(branch)?;
            if self.repository.is_ancestor(&parent_tip, &branch_tip)? {
                record.parent_oid = parent_tip;
                self.store.set(branch, record)?;
                tracing::info!(branch, %parent, "Recorded new parent tip");
                return Ok(SyncOutcome::Recorded { parent });
            }
        }

        match self
            .repository
            .rebase(branch, &parent_tip, &record.parent_oid)?
        {
            RebaseOutcome::Clean => {
                record.parent_oid = parent_tip;
                self.store.set(branch, record)?;
                tracing::info!(branch, onto = %parent, "Rebased");
                Ok(SyncOutcome::Rebased { onto: parent })
            }
            RebaseOutcome::Conflict => Ok(SyncOutcome::Conflict { onto: parent }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{SyncOutcome, SyncReport};
    use crate::{
        ctx::{Selection, StContext},
        errors::StError,
        git::RepoGateway,
        store::{BranchRecord, MetadataStore, Operation, StoreState},
        test_utils::FakeRepo,
    };
    use std::collections::BTreeSet;

    /// main <- a <- b <- c, all synced, with `a` checked out.
    fn linear_stack() -> (FakeRepo, StoreState) {
        let repo = FakeRepo::new("main");
        let mut store = StoreState::default();
        for (seq, (branch, parent)) in [("a", "main"), ("b", "a"), ("c", "b")].iter().enumerate() {
            repo.branch_from(branch, parent);
            store
                .set(branch, BranchRecord::new(*parent, repo.tip(parent).unwrap(), seq as u64))
                .unwrap();
            repo.commit(branch);
        }
        repo.checkout("a").unwrap();
        (repo, store)
    }

    fn names(report: &SyncReport) -> Vec<&str> {
        report.outcomes.iter().map(|(b, _)| b.as_str()).collect()
    }

    #[test]
    fn amended_bottom_cascades_upward() {
        let (repo, mut store) = linear_stack();
        repo.amend("a");

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let report = ctx.sync(Selection::Stack).unwrap();
        assert!(!report.halted);
        assert_eq!(report.rebased(), vec!["b", "c"]);
        assert!(matches!(report.outcomes[0].1, SyncOutcome::AlreadySynced { .. }));

        // Each branch now records its parent's current tip and sits on top of it.
        for (branch, parent) in [("b", "a"), ("c", "b")] {
            let parent_tip = repo.tip(parent).unwrap();
            assert_eq!(ctx.store.get(branch).unwrap().parent_oid, parent_tip);
            assert!(repo.is_ancestor(&parent_tip, &repo.tip(branch).unwrap()).unwrap());
        }
        assert_eq!(repo.depth("c"), 4);
        assert_eq!(repo.checked_out(), "a");
        assert_eq!(repo.log(), vec!["rebase b", "rebase c"]);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let (repo, mut store) = linear_stack();
        repo.commit("main");

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        ctx.sync(Selection::Stack).unwrap();
        let before = ctx.store.list();
        repo.clear_log();

        let report = ctx.sync(Selection::Stack).unwrap();
        assert!(report
            .outcomes
            .iter()
            .all(|(_, o)| matches!(o, SyncOutcome::AlreadySynced { .. })));
        assert!(repo.log().is_empty());
        assert_eq!(ctx.store.list(), before);
    }

    #[test]
    fn branch_rebased_by_hand_is_only_recorded() {
        let (repo, mut store) = linear_stack();
        repo.commit("main");
        let main_tip = repo.tip("main").unwrap();
        let a_record = store.get("a").unwrap();
        repo.rebase("a", &main_tip, &a_record.parent_oid).unwrap();
        repo.clear_log();

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let report = ctx.sync(Selection::Branch).unwrap();
        assert_eq!(
            report.outcomes,
            vec![(
                "a".to_string(),
                SyncOutcome::Recorded {
                    parent: "main".to_string()
                }
            )]
        );
        assert_eq!(ctx.store.get("a").unwrap().parent_oid, main_tip);
        assert!(repo.log().is_empty());
    }

    #[test]
    fn conflict_checkpoints_remaining_work() {
        let (repo, mut store) = linear_stack();
        repo.amend("a");
        repo.conflict_on_next_rebase("b");

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let report = ctx.sync(Selection::Stack).unwrap();
        assert!(report.halted);
        assert_eq!(report.conflicted(), Some("b"));
        assert_eq!(names(&report), vec!["a", "b"]);

        let checkpoint = ctx.store.checkpoint().unwrap();
        assert_eq!(checkpoint.remaining, vec!["b", "c"]);
        assert_eq!(checkpoint.original_branch, "a");
        assert_eq!(checkpoint.operation, Operation::Sync);
        assert!(checkpoint.forced.is_empty());

        // `c` was never touched.
        assert_eq!(repo.log(), vec!["rebase b"]);
    }

    #[test]
    fn resumed_cascade_matches_uninterrupted_run() {
        let (clean_repo, mut clean_store) = linear_stack();
        clean_repo.amend("a");
        StContext::new(&clean_repo, &mut clean_store, ["main".to_string()])
            .sync(Selection::Stack)
            .unwrap();

        let (repo, mut store) = linear_stack();
        repo.amend("a");
        repo.conflict_on_next_rebase("b");
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        assert!(ctx.sync(Selection::Stack).unwrap().halted);

        assert!(matches!(ctx.continue_pending(), Err(StError::UnresolvedConflict)));
        assert!(ctx.store.checkpoint().is_some());

        repo.resolve();
        let report = ctx.continue_pending().unwrap();
        assert!(!report.halted);
        // `b` was finished by hand, so only its record moves.
        assert!(matches!(report.outcomes[0].1, SyncOutcome::Recorded { .. }));
        assert!(matches!(report.outcomes[1].1, SyncOutcome::Rebased { .. }));
        assert!(ctx.store.checkpoint().is_none());
        assert_eq!(repo.checked_out(), "a");

        for branch in ["a", "b", "c"] {
            assert_eq!(repo.depth(branch), clean_repo.depth(branch));
        }
        let shape = |s: &StoreState| {
            s.list()
                .into_iter()
                .map(|(name, r)| (name, r.parent))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&store), shape(&clean_store));
    }

    #[test]
    fn nothing_to_continue_or_discard() {
        let (repo, mut store) = linear_stack();
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        assert!(matches!(ctx.continue_pending(), Err(StError::NoPendingOperation)));
        assert!(matches!(ctx.discard_pending(), Err(StError::NoPendingOperation)));
    }

    #[test]
    fn discard_drops_checkpoint() {
        let (repo, mut store) = linear_stack();
        repo.amend("a");
        repo.conflict_on_next_rebase("b");
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        ctx.sync(Selection::Stack).unwrap();
        repo.abort();

        let dropped = ctx.discard_pending().unwrap();
        assert_eq!(dropped.remaining, vec!["b", "c"]);
        assert!(ctx.store.checkpoint().is_none());
    }

    #[test]
    fn forced_branches_survive_in_checkpoint() {
        let (repo, mut store) = linear_stack();
        repo.conflict_on_next_rebase("b");
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let forced = ["a", "b", "c"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let report = ctx.cascade(order, forced, Operation::Update).unwrap();
        assert!(matches!(report.outcomes[0].1, SyncOutcome::Rebased { .. }));

        let checkpoint = ctx.store.checkpoint().unwrap();
        assert_eq!(checkpoint.remaining, vec!["b", "c"]);
        assert_eq!(checkpoint.forced, vec!["c"]);
        assert_eq!(checkpoint.operation, Operation::Update);
    }

    #[test]
    fn orphan_fails_before_any_rebase() {
        let (repo, mut store) = linear_stack();
        repo.amend("a");
        store.set("d", BranchRecord::new("gone", "", 9)).unwrap();
        repo.branch_from("d", "main");

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let err = ctx.sync(Selection::Stack).unwrap_err();
        assert!(matches!(err, StError::OrphanBranch { branch, .. } if branch == "d"));
        assert!(repo.log().is_empty());
    }
}

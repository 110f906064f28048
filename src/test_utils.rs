//! In-memory stand-ins for the repository and the review platform.

use crate::{
    errors::{StError, StResult},
    git::{CommitOptions, RebaseOutcome, RepoGateway},
    review::{ReviewGateway, ReviewStatus},
};
use async_trait::async_trait;
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Mutex,
};

/// A linear-history repository model: every commit has at most one parent.
pub(crate) struct FakeRepo {
    state: RefCell<FakeRepoState>,
}

#[derive(Default)]
struct FakeRepoState {
    parents: HashMap<String, Option<String>>,
    next_id: u64,
    branches: BTreeMap<String, String>,
    remote: BTreeMap<String, String>,
    head: String,
    conflicts: BTreeSet<String>,
    pending: Option<(String, String, String)>,
    messages: BTreeMap<String, (String, String)>,
    log: Vec<String>,
}

impl FakeRepoState {
    fn new_commit(&mut self, parent: Option<String>) -> String {
        let id = format!("c{}", self.next_id);
        self.next_id += 1;
        self.parents.insert(id.clone(), parent);
        id
    }

    fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = Some(id.to_string());
        while let Some(commit) = cursor {
            cursor = self.parents.get(&commit).cloned().flatten();
            out.push(commit);
        }
        out
    }

    fn tip(&self, branch: &str) -> StResult<String> {
        self.branches
            .get(branch)
            .cloned()
            .ok_or_else(|| StError::BranchNotFound(branch.to_string()))
    }

    fn replay(&mut self, branch: &str, onto: &str, upstream: &str) -> StResult<()> {
        let upstream_ancestry = self.ancestors(upstream);
        let mut picked = self
            .ancestors(&self.tip(branch)?)
            .into_iter()
            .take_while(|c| !upstream_ancestry.contains(c))
            .collect::<Vec<_>>();
        picked.reverse();

        let mut base = onto.to_string();
        for _ in picked {
            base = self.new_commit(Some(base));
        }
        self.branches.insert(branch.to_string(), base);
        self.head = branch.to_string();
        Ok(())
    }
}

impl FakeRepo {
    /// Creates a repository with a single commit on `trunk`, which is checked out.
    pub(crate) fn new(trunk: &str) -> Self {
        let mut state = FakeRepoState::default();
        let root = state.new_commit(None);
        state.branches.insert(trunk.to_string(), root);
        state.head = trunk.to_string();
        Self {
            state: RefCell::new(state),
        }
    }

    /// Adds a commit on top of `branch`, returning its id.
    pub(crate) fn commit(&self, branch: &str) -> String {
        let mut state = self.state.borrow_mut();
        let parent = state.branches.get(branch).cloned();
        let id = state.new_commit(parent);
        state.branches.insert(branch.to_string(), id.clone());
        id
    }

    /// Replaces the tip commit of `branch` with a rewritten one.
    pub(crate) fn amend(&self, branch: &str) -> String {
        let mut state = self.state.borrow_mut();
        let tip = state.branches[branch].clone();
        let parent = state.parents[&tip].clone();
        let id = state.new_commit(parent);
        state.branches.insert(branch.to_string(), id.clone());
        id
    }

    /// Sets the commit message reported for the tip of `branch`.
    pub(crate) fn set_message(&self, branch: &str, summary: &str, body: &str) {
        self.state
            .borrow_mut()
            .messages
            .insert(branch.to_string(), (summary.to_string(), body.to_string()));
    }

    /// Creates `branch` at the tip of `from` without checking it out.
    pub(crate) fn branch_from(&self, branch: &str, from: &str) {
        let mut state = self.state.borrow_mut();
        let tip = state.branches[from].clone();
        state.branches.insert(branch.to_string(), tip);
    }

    /// Deletes `branch` as if it were removed outside of `stk`.
    pub(crate) fn remove_branch(&self, branch: &str) {
        self.state.borrow_mut().branches.remove(branch);
    }

    /// Publishes the local tip of `branch` to the remote without going through `push`.
    pub(crate) fn mirror_to_remote(&self, branch: &str) {
        let mut state = self.state.borrow_mut();
        let tip = state.branches[branch].clone();
        state.remote.insert(branch.to_string(), tip);
    }

    /// Adds a commit to the remote copy of `branch` only.
    pub(crate) fn remote_commit(&self, branch: &str) -> String {
        let mut state = self.state.borrow_mut();
        let parent = state
            .remote
            .get(branch)
            .or_else(|| state.branches.get(branch))
            .cloned();
        let id = state.new_commit(parent);
        state.remote.insert(branch.to_string(), id.clone());
        id
    }

    /// Makes the next rebase of `branch` stop on a conflict.
    pub(crate) fn conflict_on_next_rebase(&self, branch: &str) {
        self.state.borrow_mut().conflicts.insert(branch.to_string());
    }

    /// Finishes the pending rebase, as the user would after fixing conflicts.
    pub(crate) fn resolve(&self) {
        let mut state = self.state.borrow_mut();
        let (branch, onto, upstream) = state.pending.take().expect("no rebase in progress");
        state.replay(&branch, &onto, &upstream).unwrap();
    }

    /// Drops the pending rebase, leaving the branch where it was.
    pub(crate) fn abort(&self) {
        self.state.borrow_mut().pending = None;
    }

    pub(crate) fn checked_out(&self) -> String {
        self.state.borrow().head.clone()
    }

    /// Returns the operations performed so far, e.g. `rebase b`, `push a`.
    pub(crate) fn log(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }

    pub(crate) fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Returns the number of commits between `branch`'s tip and the root.
    pub(crate) fn depth(&self, branch: &str) -> usize {
        let state = self.state.borrow();
        state.ancestors(&state.branches[branch]).len()
    }
}

impl RepoGateway for FakeRepo {
    fn current_branch(&self) -> StResult<String> {
        Ok(self.state.borrow().head.clone())
    }

    fn list_branches(&self) -> StResult<BTreeSet<String>> {
        Ok(self.state.borrow().branches.keys().cloned().collect())
    }

    fn tip(&self, branch: &str) -> StResult<String> {
        self.state.borrow().tip(branch)
    }

    fn remote_tip(&self, branch: &str) -> StResult<Option<String>> {
        Ok(self.state.borrow().remote.get(branch).cloned())
    }

    fn merge_base(&self, a: &str, b: &str) -> StResult<String> {
        let state = self.state.borrow();
        let theirs = state.ancestors(b);
        state
            .ancestors(a)
            .into_iter()
            .find(|c| theirs.contains(c))
            .ok_or_else(|| StError::RepositoryOperation("no merge base".to_string()))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> StResult<bool> {
        Ok(self
            .state
            .borrow()
            .ancestors(descendant)
            .iter()
            .any(|c| c == ancestor))
    }

    fn rebase(&self, branch: &str, onto: &str, upstream: &str) -> StResult<RebaseOutcome> {
        let mut state = self.state.borrow_mut();
        state.log.push(format!("rebase {}", branch));
        if state.conflicts.remove(branch) {
            state.pending = Some((branch.to_string(), onto.to_string(), upstream.to_string()));
            return Ok(RebaseOutcome::Conflict);
        }
        state.replay(branch, onto, upstream)?;
        Ok(RebaseOutcome::Clean)
    }

    fn rebase_in_progress(&self) -> StResult<bool> {
        Ok(self.state.borrow().pending.is_some())
    }

    fn push(&self, branch: &str, force: bool) -> StResult<()> {
        let mut state = self.state.borrow_mut();
        let tip = state.tip(branch)?;
        state.remote.insert(branch.to_string(), tip);
        state.log.push(if force {
            format!("force-push {}", branch)
        } else {
            format!("push {}", branch)
        });
        Ok(())
    }

    fn fetch(&self) -> StResult<()> {
        self.state.borrow_mut().log.push("fetch".to_string());
        Ok(())
    }

    fn delete_branch(&self, branch: &str) -> StResult<()> {
        let mut state = self.state.borrow_mut();
        if state.head == branch {
            return Err(StError::RepositoryOperation(format!(
                "cannot delete checked out branch {}",
                branch
            )));
        }
        state
            .branches
            .remove(branch)
            .ok_or_else(|| StError::BranchNotFound(branch.to_string()))?;
        state.log.push(format!("delete {}", branch));
        Ok(())
    }

    fn checkout(&self, branch: &str) -> StResult<()> {
        let mut state = self.state.borrow_mut();
        state.tip(branch)?;
        state.head = branch.to_string();
        Ok(())
    }

    fn create_branch(&self, branch: &str) -> StResult<()> {
        let mut state = self.state.borrow_mut();
        let head = state.head.clone();
        let tip = state.tip(&head)?;
        state.branches.insert(branch.to_string(), tip);
        state.head = branch.to_string();
        Ok(())
    }

    fn reset_to_remote(&self, branch: &str) -> StResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(remote_tip) = state.remote.get(branch).cloned() {
            state.branches.insert(branch.to_string(), remote_tip);
        }
        Ok(())
    }

    fn commit_summary(&self, branch: &str) -> StResult<String> {
        Ok(match self.state.borrow().messages.get(branch) {
            Some((summary, _)) => summary.clone(),
            None => format!("work on {}", branch),
        })
    }

    fn commit_body(&self, branch: &str) -> StResult<String> {
        let state = self.state.borrow();
        Ok(state.messages.get(branch).map(|(_, body)| body.clone()).unwrap_or_default())
    }

    fn commit(&self, options: &CommitOptions) -> StResult<()> {
        let head = self.current_branch()?;
        if options.amend {
            FakeRepo::amend(self, &head);
        } else {
            FakeRepo::commit(self, &head);
        }
        let verb = if options.amend { "amend" } else { "commit" };
        self.state.borrow_mut().log.push(format!("{} {}", verb, head));
        Ok(())
    }
}

/// A review platform that hands out sequential pull request numbers starting at 1.
#[derive(Default)]
pub(crate) struct FakeReviews {
    state: Mutex<FakeReviewState>,
}

#[derive(Default)]
struct FakeReviewState {
    created: Vec<(String, String)>,
    retargeted: Vec<(u64, String)>,
    titles: Vec<String>,
    reviewers: Vec<(u64, Vec<String>)>,
    statuses: HashMap<u64, ReviewStatus>,
    unreachable: BTreeSet<u64>,
}

impl FakeReviews {
    /// Returns the `(branch, base)` pairs of created pull requests, in creation order.
    pub(crate) fn created(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().created.clone()
    }

    /// Returns the `(number, base)` pairs of base updates, in order.
    pub(crate) fn retargeted(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().retargeted.clone()
    }

    /// Returns the titles of created pull requests, in creation order.
    pub(crate) fn titles(&self) -> Vec<String> {
        self.state.lock().unwrap().titles.clone()
    }

    /// Returns the `(number, reviewers)` review requests, in order.
    pub(crate) fn requested(&self) -> Vec<(u64, Vec<String>)> {
        self.state.lock().unwrap().reviewers.clone()
    }

    pub(crate) fn set_status(&self, number: u64, status: ReviewStatus) {
        self.state.lock().unwrap().statuses.insert(number, status);
    }

    /// Makes status lookups of `number` fail.
    pub(crate) fn fail_status(&self, number: u64) {
        self.state.lock().unwrap().unreachable.insert(number);
    }
}

#[async_trait]
impl ReviewGateway for FakeReviews {
    async fn create(&self, branch: &str, base: &str, title: &str) -> StResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.created.push((branch.to_string(), base.to_string()));
        state.titles.push(title.to_string());
        let number = state.created.len() as u64;
        state.statuses.insert(number, ReviewStatus::Open);
        Ok(number)
    }

    async fn update_base(&self, number: u64, base: &str) -> StResult<()> {
        self.state
            .lock()
            .unwrap()
            .retargeted
            .push((number, base.to_string()));
        Ok(())
    }

    async fn status(&self, number: u64) -> StResult<ReviewStatus> {
        let state = self.state.lock().unwrap();
        if state.unreachable.contains(&number) {
            let message = format!("pull request {} unreachable", number);
            return Err(StError::RepositoryOperation(message));
        }
        Ok(state.statuses.get(&number).copied().unwrap_or(ReviewStatus::Open))
    }

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> StResult<()> {
        self.state
            .lock()
            .unwrap()
            .reviewers
            .push((number, reviewers.to_vec()));
        Ok(())
    }
}

//! Pushing branches and keeping their pull requests pointed at the right base.

use super::StContext;
use crate::{
    errors::{StError, StResult},
    review::ReviewGateway,
    store::ReviewMetadata,
};

/// What will happen to a branch's pull request when it is published.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ReviewAction {
    /// A new pull request is opened against `base`.
    Create { base: String },
    /// The existing pull request is retargeted from `from` to `to`.
    UpdateBase { number: u64, from: String, to: String },
    /// The existing pull request already targets the parent.
    Unchanged { number: u64 },
    /// Pull requests were not requested.
    Skipped,
}

/// The planned publication of a single branch.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublishStep {
    /// The branch to publish.
    pub branch: String,
    /// The parent the pull request targets.
    pub parent: String,
    /// `Some(force)` if the branch must be pushed, [None] if the remote is up to date.
    pub push: Option<bool>,
    /// What happens to the pull request.
    pub review: ReviewAction,
}

/// What actually happened to a branch during publication.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublishOutcome {
    /// `true` if the branch was pushed.
    pub pushed: bool,
    /// The pull request action that was carried out, with the number of a newly created request.
    pub review: ReviewAction,
    /// The pull request associated with the branch after publication.
    pub number: Option<u64>,
}

/// The result of publishing, in ancestor-first order.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct PublishReport {
    pub outcomes: Vec<(String, PublishOutcome)>,
}

fn is_separator(c: char) -> bool {
    c == '-' || c == '_'
}

/// Finds an issue key such as `ABC-123` in a branch name.
///
/// The key is three or more capitals followed by two or more digits, optionally joined by `-` or
/// `_`, and delimited by `-`, `_` or the ends of the name. It is always returned `-`-joined.
pub fn issue_marker(branch: &str) -> Option<String> {
    let marker_at = |s: &str| {
        let letters = s.chars().take_while(char::is_ascii_uppercase).count();
        let rest = &s[letters..];
        let rest = rest.strip_prefix(is_separator).unwrap_or(rest);
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let tail = &rest[digits..];
        (letters >= 3 && digits >= 2 && (tail.is_empty() || tail.starts_with(is_separator)))
            .then(|| format!("{}-{}", &s[..letters], &rest[..digits]))
    };

    std::iter::once(0)
        .chain(branch.match_indices(is_separator).map(|(i, _)| i + 1))
        .find_map(|start| marker_at(&branch[start..]))
}

/// Returns the reviewers listed on a `Reviewer:` or `Reviewers:` line of a commit body.
pub fn requested_reviewers(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| {
            let key = key.trim_end();
            key.eq_ignore_ascii_case("reviewer") || key.eq_ignore_ascii_case("reviewers")
        })
        .map(|(_, names)| {
            names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Prefixes `summary` with the issue key of `branch`, unless it already mentions it.
fn review_title(branch: &str, summary: &str) -> String {
    match issue_marker(branch) {
        Some(marker) if !summary.contains(&marker) => format!("[{}] {}", marker, summary),
        _ => summary.to_string(),
    }
}

impl<'a> StContext<'a> {
    /// Computes what [Self::publish] would do with `branches`, without touching anything.
    ///
    /// Fails with [StError::NeedsRestack] if any branch does not sit on its parent's tip.
    pub fn publish_plan(
        &self,
        branches: &[String],
        create_reviews: bool,
    ) -> StResult<Vec<PublishStep>> {
        // Nothing may be pushed while any part of the selection needs a restack.
        for branch in branches {
            let record = self
                .store
                .get(branch)
                .ok_or_else(|| StError::BranchNotTracked(branch.clone()))?;
            if self.needs_restack(branch, &record)? {
                return Err(StError::NeedsRestack(branch.clone()));
            }
        }

        branches
            .iter()
            .map(|branch| {
                let record = self
                    .store
                    .get(branch)
                    .ok_or_else(|| StError::BranchNotTracked(branch.clone()))?;

                let local_tip = self.repository.tip(branch)?;
                let push = match self.repository.remote_tip(branch)? {
                    None => Some(false),
                    Some(remote_tip) if remote_tip == local_tip => None,
                    Some(remote_tip) => {
                        Some(!self.repository.is_ancestor(&remote_tip, &local_tip)?)
                    }
                };

                let review = match (create_reviews, record.review) {
                    (false, _) => ReviewAction::Skipped,
                    (true, None) => ReviewAction::Create {
                        base: record.parent.clone(),
                    },
                    (true, Some(meta)) if meta.base != record.parent => ReviewAction::UpdateBase {
                        number: meta.number,
                        from: meta.base,
                        to: record.parent.clone(),
                    },
                    (true, Some(meta)) => ReviewAction::Unchanged {
                        number: meta.number,
                    },
                };

                Ok(PublishStep {
                    branch: branch.clone(),
                    parent: record.parent,
                    push,
                    review,
                })
            })
            .collect()
    }

    /// Pushes `branches` in order and, if `create_reviews` is set, opens or retargets their
    /// pull requests so that each one merges into its parent.
    pub async fn publish(
        &mut self,
        reviews: &dyn ReviewGateway,
        branches: &[String],
        create_reviews: bool,
    ) -> StResult<PublishReport> {
        let plan = self.publish_plan(branches, create_reviews)?;
        let mut report = PublishReport::default();

        for step in plan {
            if let Some(force) = step.push {
                self.repository.push(&step.branch, force)?;
                tracing::info!(branch = %step.branch, force, "Pushed");
            }

            let number = match &step.review {
                ReviewAction::Create { base } => {
                    let summary = self.repository.commit_summary(&step.branch)?;
                    let title = review_title(&step.branch, &summary);
                    let number = reviews.create(&step.branch, base, &title).await?;
                    self.store_review(&step.branch, number, base)?;

                    let body = self.repository.commit_body(&step.branch)?;
                    let reviewers = requested_reviewers(&body);
                    if !reviewers.is_empty() {
                        reviews.request_reviewers(number, &reviewers).await?;
                    }
                    Some(number)
                }
                ReviewAction::UpdateBase { number, to, .. } => {
                    reviews.update_base(*number, to).await?;
                    self.store_review(&step.branch, *number, to)?;
                    Some(*number)
                }
                ReviewAction::Unchanged { number } => Some(*number),
                ReviewAction::Skipped => self
                    .store
                    .get(&step.branch)
                    .and_then(|r| r.review)
                    .map(|r| r.number),
            };

            report.outcomes.push((
                step.branch,
                PublishOutcome {
                    pushed: step.push.is_some(),
                    review: step.review,
                    number,
                },
            ));
        }

        Ok(report)
    }

    /// Persists the pull request of `branch`, re-reading the record first.
    fn store_review(&mut self, branch: &str, number: u64, base: &str) -> StResult<()> {
        let mut record = self
            .store
            .get(branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;
        record.review = Some(ReviewMetadata {
            number,
            base: base.to_string(),
        });
        self.store.set(branch, record)
    }
}

#[cfg(test)]
mod test {
    use super::{issue_marker, requested_reviewers, ReviewAction};
    use crate::{
        ctx::{Selection, StContext},
        errors::StError,
        git::RepoGateway,
        store::{BranchRecord, MetadataStore, ReviewMetadata, StoreState},
        test_utils::{FakeRepo, FakeReviews},
    };

    /// main <- a <- b, with `b` checked out.
    fn stack() -> (FakeRepo, StoreState) {
        let repo = FakeRepo::new("main");
        let mut store = StoreState::default();
        repo.branch_from("a", "main");
        store
            .set("a", BranchRecord::new("main", repo.tip("main").unwrap(), 0))
            .unwrap();
        repo.commit("a");
        repo.branch_from("b", "a");
        store
            .set("b", BranchRecord::new("a", repo.tip("a").unwrap(), 1))
            .unwrap();
        repo.commit("b");
        repo.checkout("b").unwrap();
        (repo, store)
    }

    #[tokio::test]
    async fn publishes_stack_parent_first() {
        let (repo, mut store) = stack();
        let reviews = FakeReviews::default();

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let branches = ctx.select_current(Selection::Stack).unwrap();
        let report = ctx.publish(&reviews, &branches, true).await.unwrap();

        assert_eq!(repo.log(), vec!["push a", "push b"]);
        assert_eq!(
            reviews.created(),
            vec![
                ("a".to_string(), "main".to_string()),
                ("b".to_string(), "a".to_string())
            ]
        );
        assert_eq!(report.outcomes[1].1.number, Some(2));
        assert_eq!(
            ctx.store.get("b").unwrap().review,
            Some(ReviewMetadata {
                number: 2,
                base: "a".to_string()
            })
        );

        // Publishing again has nothing left to do.
        repo.clear_log();
        let report = ctx.publish(&reviews, &branches, true).await.unwrap();
        assert!(repo.log().is_empty());
        assert_eq!(reviews.created().len(), 2);
        assert!(report
            .outcomes
            .iter()
            .all(|(_, o)| !o.pushed && matches!(o.review, ReviewAction::Unchanged { .. })));
    }

    #[tokio::test]
    async fn push_only_leaves_reviews_alone() {
        let (repo, mut store) = stack();
        let reviews = FakeReviews::default();

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let branches = vec!["a".to_string(), "b".to_string()];
        ctx.publish(&reviews, &branches, false).await.unwrap();

        assert_eq!(repo.log(), vec!["push a", "push b"]);
        assert!(reviews.created().is_empty());
        assert!(ctx.store.get("a").unwrap().review.is_none());
    }

    #[tokio::test]
    async fn rewritten_branch_is_force_pushed() {
        let (repo, mut store) = stack();
        repo.mirror_to_remote("a");
        repo.mirror_to_remote("b");
        repo.amend("b");

        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let branches = vec!["a".to_string(), "b".to_string()];
        let plan = ctx.publish_plan(&branches, false).unwrap();
        assert_eq!(plan[0].push, None);
        assert_eq!(plan[1].push, Some(true));

        ctx.publish(&FakeReviews::default(), &branches, false)
            .await
            .unwrap();
        assert_eq!(repo.log(), vec!["force-push b"]);
    }

    #[tokio::test]
    async fn moved_parent_retargets_review() {
        let (repo, mut store) = stack();
        let mut record = store.get("b").unwrap();
        record.review = Some(ReviewMetadata {
            number: 7,
            base: "old-parent".to_string(),
        });
        store.set("b", record).unwrap();
        repo.mirror_to_remote("b");

        let reviews = FakeReviews::default();
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        ctx.publish(&reviews, &["b".to_string()], true).await.unwrap();

        assert_eq!(reviews.retargeted(), vec![(7, "a".to_string())]);
        assert!(reviews.created().is_empty());
        assert_eq!(ctx.store.get("b").unwrap().review.unwrap().base, "a");
    }

    #[tokio::test]
    async fn drifted_branch_blocks_any_push() {
        let (repo, mut store) = stack();
        repo.amend("a");

        let reviews = FakeReviews::default();
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let branches = vec!["a".to_string(), "b".to_string()];
        let err = ctx.publish(&reviews, &branches, true).await.unwrap_err();

        assert!(matches!(err, StError::NeedsRestack(branch) if branch == "b"));
        assert!(repo.log().is_empty());
        assert!(reviews.created().is_empty());
    }

    #[test]
    fn issue_marker_from_branch_name() {
        assert_eq!(issue_marker("ENG-1234-fix-login").as_deref(), Some("ENG-1234"));
        assert_eq!(issue_marker("fix_ENG_42").as_deref(), Some("ENG-42"));
        assert_eq!(issue_marker("jdoe-PLAT77-retry").as_deref(), Some("PLAT-77"));
        assert_eq!(issue_marker("AB-12-short-project"), None);
        assert_eq!(issue_marker("ENG-1-single-digit"), None);
        assert_eq!(issue_marker("xENG-12"), None);
        assert_eq!(issue_marker("ENG-12x"), None);
    }

    #[test]
    fn reviewers_from_commit_body() {
        let body = "Fix the retry loop.\n\nReviewers: alice, bob ,\nTested: locally";
        assert_eq!(requested_reviewers(body), vec!["alice", "bob"]);
        assert_eq!(requested_reviewers("reviewer : carol"), vec!["carol"]);
        assert!(requested_reviewers("No reviewers here.").is_empty());
    }

    #[tokio::test]
    async fn new_review_carries_issue_marker_and_reviewers() {
        let repo = FakeRepo::new("main");
        let mut store = StoreState::default();
        repo.branch_from("ENG-42-retry", "main");
        store
            .set("ENG-42-retry", BranchRecord::new("main", repo.tip("main").unwrap(), 0))
            .unwrap();
        repo.commit("ENG-42-retry");
        repo.set_message("ENG-42-retry", "Retry failed uploads", "Reviewers: alice, bob");

        let reviews = FakeReviews::default();
        let mut ctx = StContext::new(&repo, &mut store, ["main".to_string()]);
        let branches = vec!["ENG-42-retry".to_string()];
        ctx.publish(&reviews, &branches, true).await.unwrap();

        assert_eq!(reviews.titles(), vec!["[ENG-42] Retry failed uploads"]);
        assert_eq!(
            reviews.requested(),
            vec![(1, vec!["alice".to_string(), "bob".to_string()])]
        );
    }
}

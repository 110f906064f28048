//! Retiring the bottom branch of a stack once its pull request has merged.

use super::{StContext, SyncReport};
use crate::{
    errors::{StError, StResult},
    review::{ReviewGateway, ReviewStatus},
    store::Operation,
};
use std::collections::BTreeSet;

/// The result of [StContext::land].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LandReport {
    /// The bottom branch that was landed.
    pub landed: String,
    /// The trunk the landed branch had merged into.
    pub trunk: String,
    /// The direct children that were moved onto the trunk.
    pub reparented: Vec<String>,
    /// The cascade over the upstacks of the moved children.
    pub sync: SyncReport,
}

impl<'a> StContext<'a> {
    /// Lands the bottom branch of `branch`'s stack.
    ///
    /// The landed branch is deleted and its children move onto the trunk. Their recorded parent
    /// tip is kept, so the cascade only replays their own commits onto the trunk.
    pub async fn land(
        &mut self,
        reviews: &dyn ReviewGateway,
        branch: &str,
    ) -> StResult<LandReport> {
        let graph = self.build_graph()?;
        let bottom = graph
            .bottom_of(branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;
        let (landed, children) = (bottom.name.clone(), bottom.children.clone());
        let record = bottom
            .record
            .clone()
            .ok_or_else(|| StError::BranchNotTracked(landed.clone()))?;
        let trunk = record.parent.clone();

        let Some(review) = record.review else {
            return Err(StError::NotMerged(landed));
        };
        let status = reviews.status(review.number).await?;
        if status != ReviewStatus::Merged {
            tracing::debug!(branch = %landed, ?status, "Pull request has not merged");
            return Err(StError::NotMerged(landed));
        }

        if self.repository.current_branch().ok().as_deref() == Some(landed.as_str()) {
            self.repository.checkout(&trunk)?;
        }
        self.repository.delete_branch(&landed)?;
        self.store.remove(&landed)?;
        tracing::info!(branch = %landed, number = review.number, "Landed");

        for child in children.iter() {
            if let Some(mut child_record) = self.store.get(child) {
                child_record.parent = trunk.clone();
                self.store.set(child, child_record)?;
            }
        }

        let order = children
            .iter()
            .flat_map(|child| graph.upstack(child))
            .collect::<Vec<_>>();
        let sync = self.cascade(
            order,
            BTreeSet::new(),
            Operation::Land {
                landed: landed.clone(),
            },
        )?;

        Ok(LandReport {
            landed,
            trunk,
            reparented: children,
            sync,
        })
    }
}

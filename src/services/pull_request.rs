//! Pull request operations.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::{require, user_ids};
use crate::assignment::{needs_more_reviewers, replace_reviewer, select_reviewers, RandomSource};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{CreatePrRequest, PrStatus, PullRequest, ReassignRequest, REVIEWER_SLOTS};

/// A pull request after one of its reviewers was swapped out.
#[derive(Debug, Clone)]
pub struct Reassignment {
    pub pr: PullRequest,
    pub replaced_by: String,
}

#[derive(Clone)]
pub struct PullRequestService {
    repo: Arc<dyn Repository>,
    rng: Arc<dyn RandomSource>,
}

impl PullRequestService {
    pub fn new(repo: Arc<dyn Repository>, rng: Arc<dyn RandomSource>) -> Self {
        Self { repo, rng }
    }

    /// Open a pull request and assign up to two active teammates of the
    /// author as reviewers.
    ///
    /// Having nobody to assign is not an error; the pull request is then
    /// flagged as needing more reviewers.
    pub async fn create(&self, request: CreatePrRequest) -> Result<PullRequest, AppError> {
        require("pull_request_id", &request.id)?;
        require("pull_request_name", &request.title)?;
        require("author_id", &request.author_id)?;

        let author = self
            .repo
            .get_user(&request.author_id)
            .await
            .map_err(|e| e.context("failed to load author"))?;

        let pool = user_ids(
            self.repo
                .get_active_users_by_team(&author.team_name)
                .await
                .map_err(|e| e.context("failed to load team"))?,
        );

        let reviewers = {
            let mut rng = self.rng.rng();
            select_reviewers(
                &author.user_id,
                &pool,
                REVIEWER_SLOTS,
                &HashSet::new(),
                &mut rng,
            )
        };

        let pr = PullRequest {
            id: request.id,
            title: request.title,
            author_id: author.user_id,
            status: PrStatus::Open,
            need_more_reviewers: needs_more_reviewers(&reviewers),
            reviewers,
            created_at: Utc::now(),
            merged_at: None,
        };

        self.repo
            .create_pr(&pr)
            .await
            .map_err(|e| e.context("failed to create pull request"))?;

        tracing::info!(
            pr_id = %pr.id,
            author_id = %pr.author_id,
            reviewers = ?pr.reviewers,
            "pull request created"
        );

        self.repo.get_pr(&pr.id).await
    }

    /// Replace one reviewer with an active member of that reviewer's team.
    pub async fn reassign(&self, request: ReassignRequest) -> Result<Reassignment, AppError> {
        require("pull_request_id", &request.pull_request_id)?;
        require("old_reviewer_id", &request.old_reviewer_id)?;

        let pr = self
            .repo
            .get_pr(&request.pull_request_id)
            .await
            .map_err(|e| e.context("failed to load pull request"))?;
        if pr.is_merged() {
            return Err(AppError::PrMerged(format!("{} is merged", pr.id)));
        }

        let old = self
            .repo
            .get_user(&request.old_reviewer_id)
            .await
            .map_err(|e| e.context("failed to load reviewer"))?;

        let pool = user_ids(
            self.repo
                .get_active_users_by_team(&old.team_name)
                .await
                .map_err(|e| e.context("failed to load team"))?,
        );

        let replacement = {
            let mut rng = self.rng.rng();
            replace_reviewer(&pr, &old.user_id, &pool, &mut rng)?
        };

        let updated = PullRequest {
            need_more_reviewers: replacement.need_more_reviewers(),
            reviewers: replacement.reviewers,
            ..pr
        };
        self.repo
            .update_pr(&updated)
            .await
            .map_err(|e| e.context("failed to update reviewers"))?;

        tracing::info!(
            pr_id = %updated.id,
            old_reviewer_id = %old.user_id,
            new_reviewer_id = %replacement.replaced_by,
            "reviewer reassigned"
        );

        Ok(Reassignment {
            pr: self.repo.get_pr(&updated.id).await?,
            replaced_by: replacement.replaced_by,
        })
    }

    /// Merge a pull request. Merging twice returns the same frozen record.
    pub async fn merge(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        require("pull_request_id", pr_id)?;

        self.repo
            .merge_pr(pr_id)
            .await
            .map_err(|e| e.context("failed to merge pull request"))?;

        let pr = self.repo.get_pr(pr_id).await?;
        tracing::info!(pr_id, merged_at = ?pr.merged_at, "pull request merged");
        Ok(pr)
    }
}

//! User operations, including mass deactivation of a team.

use std::collections::HashSet;
use std::sync::Arc;

use super::{require, user_ids};
use crate::assignment::{repair_reviewers, RandomSource};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{PullRequest, PullRequestShort, User};

/// Outcome of deactivating a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeactivationSummary {
    /// Users that were active right before the deactivation
    pub deactivated_users: usize,
    /// Open pull requests that had a reviewer from the team
    pub prs_processed: usize,
    /// Pull requests whose reviewer list was rewritten
    pub prs_repaired: usize,
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
    rng: Arc<dyn RandomSource>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>, rng: Arc<dyn RandomSource>) -> Self {
        Self { repo, rng }
    }

    pub async fn set_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        require("user_id", user_id)?;

        self.repo
            .update_user_active(user_id, is_active)
            .await
            .map_err(|e| e.context("failed to update user"))?;

        tracing::info!(user_id, is_active, "user active flag updated");

        self.repo.get_user(user_id).await
    }

    /// Pull requests `user_id` is assigned to review. An unknown user simply
    /// has none.
    pub async fn get_reviews(&self, user_id: &str) -> Result<Vec<PullRequestShort>, AppError> {
        require("user_id", user_id)?;
        self.repo
            .get_prs_for_reviewer(user_id)
            .await
            .map_err(|e| e.context("failed to list reviews"))
    }

    /// Deactivate every member of `team_name`, then repair the open pull
    /// requests they were reviewing.
    ///
    /// The deactivation commits on its own. Repair is best-effort: failures
    /// are logged and skipped.
    pub async fn deactivate_team(&self, team_name: &str) -> Result<DeactivationSummary, AppError> {
        require("team_name", team_name)?;

        let deactivated: HashSet<String> = self
            .repo
            .get_active_users_by_team(team_name)
            .await
            .map_err(|e| e.context("failed to snapshot active users"))?
            .into_iter()
            .map(|u| u.user_id)
            .collect();

        self.repo
            .deactivate_users_by_team(team_name)
            .await
            .map_err(|e| e.context("failed to deactivate team"))?;

        let mut summary = DeactivationSummary {
            deactivated_users: deactivated.len(),
            ..Default::default()
        };

        let open_prs = match self
            .repo
            .get_open_prs_with_reviewers_from_team(team_name)
            .await
        {
            Ok(prs) => prs,
            Err(e) => {
                tracing::warn!(team_name, error = %e, "skipping reviewer repair");
                return Ok(summary);
            }
        };

        for pr in open_prs {
            summary.prs_processed += 1;
            match self.repair(&pr, team_name, &deactivated).await {
                Ok(true) => summary.prs_repaired += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(pr_id = %pr.id, error = %e, "failed to repair reviewers");
                }
            }
        }

        tracing::info!(
            team_name,
            deactivated_users = summary.deactivated_users,
            prs_processed = summary.prs_processed,
            prs_repaired = summary.prs_repaired,
            "team deactivated"
        );

        Ok(summary)
    }

    /// Returns whether the pull request was rewritten.
    async fn repair(
        &self,
        pr: &PullRequest,
        team_name: &str,
        deactivated: &HashSet<String>,
    ) -> Result<bool, AppError> {
        let pool = user_ids(self.repo.get_active_users_by_team(team_name).await?);

        let reviewers = {
            let mut rng = self.rng.rng();
            repair_reviewers(pr, deactivated, &pool, &mut rng)
        };
        let Some(reviewers) = reviewers else {
            return Ok(false);
        };

        let repaired = PullRequest {
            reviewers,
            ..pr.clone()
        };
        self.repo.update_pr(&repaired).await?;

        tracing::debug!(
            pr_id = %pr.id,
            reviewers = ?repaired.reviewers,
            "reviewers repaired"
        );
        Ok(true)
    }
}

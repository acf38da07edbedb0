//! Read-only statistics over the store.

use std::sync::Arc;

use crate::db::{Repository, TOP_REVIEWERS_LIMIT};
use crate::errors::AppError;
use crate::models::{AvgCloseTime, PrsStatus, TeamMetric, UserAssignment};

#[derive(Clone)]
pub struct StatsService {
    repo: Arc<dyn Repository>,
}

impl StatsService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn prs_total(&self) -> Result<i64, AppError> {
        self.repo
            .count_prs()
            .await
            .map_err(|e| e.context("failed to count pull requests"))
    }

    pub async fn prs_status(&self) -> Result<PrsStatus, AppError> {
        self.repo
            .count_prs_by_status()
            .await
            .map_err(|e| e.context("failed to count pull requests by status"))
    }

    pub async fn assignments_per_user(&self) -> Result<Vec<UserAssignment>, AppError> {
        self.repo
            .assignments_per_user()
            .await
            .map_err(|e| e.context("failed to count assignments"))
    }

    pub async fn top_reviewers(&self) -> Result<Vec<UserAssignment>, AppError> {
        self.repo
            .top_reviewers(TOP_REVIEWERS_LIMIT)
            .await
            .map_err(|e| e.context("failed to rank reviewers"))
    }

    pub async fn avg_close_time(&self) -> Result<AvgCloseTime, AppError> {
        let (average, merged) = self
            .repo
            .avg_close_time()
            .await
            .map_err(|e| e.context("failed to compute close time"))?;
        Ok(AvgCloseTime::new(average, merged))
    }

    pub async fn idle_users_per_team(&self) -> Result<Vec<TeamMetric>, AppError> {
        self.repo
            .idle_users_per_team()
            .await
            .map_err(|e| e.context("failed to count idle users"))
    }

    pub async fn needy_prs_per_team(&self) -> Result<Vec<TeamMetric>, AppError> {
        self.repo
            .needy_prs_per_team()
            .await
            .map_err(|e| e.context("failed to count pull requests needing reviewers"))
    }
}

//! Statistics API endpoints.

use axum::extract::State;

use super::{ApiResponse, ApiResult};
use crate::models::{
    AvgCloseTime, PrsStatus, PrsTotal, TeamMetrics, TopReviewers, UserAssignments,
};
use crate::AppState;

/// GET /stats/prs-total
pub async fn prs_total(State(state): State<AppState>) -> ApiResult<PrsTotal> {
    let total_prs = state.stats.prs_total().await?;
    Ok(ApiResponse::ok(PrsTotal { total_prs }))
}

/// GET /stats/prs-status
pub async fn prs_status(State(state): State<AppState>) -> ApiResult<PrsStatus> {
    Ok(ApiResponse::ok(state.stats.prs_status().await?))
}

/// GET /stats/assignments-per-user
pub async fn assignments_per_user(State(state): State<AppState>) -> ApiResult<UserAssignments> {
    let user_assignments = state.stats.assignments_per_user().await?;
    Ok(ApiResponse::ok(UserAssignments { user_assignments }))
}

/// GET /stats/top-reviewers
pub async fn top_reviewers(State(state): State<AppState>) -> ApiResult<TopReviewers> {
    let top_reviewers = state.stats.top_reviewers().await?;
    Ok(ApiResponse::ok(TopReviewers { top_reviewers }))
}

/// GET /stats/avg-close-time
pub async fn avg_close_time(State(state): State<AppState>) -> ApiResult<AvgCloseTime> {
    Ok(ApiResponse::ok(state.stats.avg_close_time().await?))
}

/// GET /stats/idle-users-per-team
pub async fn idle_users_per_team(State(state): State<AppState>) -> ApiResult<TeamMetrics> {
    let team_metrics = state.stats.idle_users_per_team().await?;
    Ok(ApiResponse::ok(TeamMetrics { team_metrics }))
}

/// GET /stats/needy-prs-per-team
pub async fn needy_prs_per_team(State(state): State<AppState>) -> ApiResult<TeamMetrics> {
    let team_metrics = state.stats.needy_prs_per_team().await?;
    Ok(ApiResponse::ok(TeamMetrics { team_metrics }))
}

//! User API endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{ApiJson, ApiQuery, ApiResponse, ApiResult, MessageBody};
use crate::models::{DeactivateTeamRequest, PullRequestShort, SetActiveRequest, User, UserQuery};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ReviewsBody {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

/// POST /users/setIsActive - Toggle a user's active flag.
pub async fn set_is_active(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SetActiveRequest>,
) -> ApiResult<UserBody> {
    let user = state
        .users
        .set_active(&request.user_id, request.is_active)
        .await?;
    Ok(ApiResponse::ok(UserBody { user }))
}

/// GET /users/getReview?user_id= - Pull requests a user reviews.
pub async fn get_review(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<ReviewsBody> {
    let pull_requests = state.users.get_reviews(&query.user_id).await?;
    Ok(ApiResponse::ok(ReviewsBody {
        user_id: query.user_id,
        pull_requests,
    }))
}

/// POST /users/deactivateByTeam - Deactivate a team and repair its reviews.
pub async fn deactivate_by_team(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeactivateTeamRequest>,
) -> ApiResult<MessageBody> {
    state.users.deactivate_team(&request.team_name).await?;
    Ok(ApiResponse::ok(MessageBody {
        message: "users deactivated and PRs reassigned successfully",
    }))
}

//! Team API endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{ApiJson, ApiQuery, ApiResponse, ApiResult, MessageBody};
use crate::models::{AddMemberRequest, Team, TeamQuery};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TeamBody {
    pub team: Team,
}

/// POST /team/add - Create a team with its members.
pub async fn add_team(
    State(state): State<AppState>,
    ApiJson(team): ApiJson<Team>,
) -> ApiResult<TeamBody> {
    let team = state.teams.create_team(team).await?;
    Ok(ApiResponse::created(TeamBody { team }))
}

/// POST /team/add-member - Put a user into an existing team.
pub async fn add_member(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddMemberRequest>,
) -> ApiResult<MessageBody> {
    state.teams.add_member(request).await?;
    Ok(ApiResponse::ok(MessageBody {
        message: "member added successfully",
    }))
}

/// GET /team/get?team_name= - Fetch a team with its members.
pub async fn get_team(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TeamQuery>,
) -> ApiResult<TeamBody> {
    let team = state.teams.get_team(&query.team_name).await?;
    Ok(ApiResponse::ok(TeamBody { team }))
}

//! Pull request API endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::models::{CreatePrRequest, MergePrRequest, PullRequest, ReassignRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PrBody {
    pub pr: PullRequest,
}

#[derive(Debug, Serialize)]
pub struct ReassignBody {
    pub pr: PullRequest,
    pub replaced_by: String,
}

/// POST /pullRequest/create - Open a pull request with auto-assigned reviewers.
pub async fn create_pr(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePrRequest>,
) -> ApiResult<PrBody> {
    let pr = state.prs.create(request).await?;
    Ok(ApiResponse::created(PrBody { pr }))
}

/// POST /pullRequest/merge - Merge a pull request (idempotent).
pub async fn merge_pr(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MergePrRequest>,
) -> ApiResult<PrBody> {
    let pr = state.prs.merge(&request.pull_request_id).await?;
    Ok(ApiResponse::ok(PrBody { pr }))
}

/// POST /pullRequest/reassign - Swap one reviewer for a teammate.
pub async fn reassign_pr(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ReassignRequest>,
) -> ApiResult<ReassignBody> {
    let outcome = state.prs.reassign(request).await?;
    Ok(ApiResponse::ok(ReassignBody {
        pr: outcome.pr,
        replaced_by: outcome.replaced_by,
    }))
}

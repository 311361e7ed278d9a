//! Pull request API endpoints.

use axum::extract::{Query, State};

use super::{require, ApiJson, ApiResponse, ApiResult};
use crate::models::{
    CreatePullRequestRequest, MergePullRequestRequest, PullRequest, PullRequestQuery,
    ReassignReviewerRequest, Reassignment,
};
use crate::AppState;

/// POST /pullRequest/create - Create a pull request and assign reviewers.
pub async fn create_pull_request(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePullRequestRequest>,
) -> ApiResult<PullRequest> {
    require(&request.pull_request_id, "pull_request_id")?;
    require(&request.pull_request_name, "pull_request_name")?;
    require(&request.author_id, "author_id")?;

    let pr = state
        .service
        .create_pull_request(
            &request.pull_request_id,
            &request.pull_request_name,
            &request.author_id,
        )
        .await?;
    Ok(ApiResponse::created(pr))
}

/// POST /pullRequest/merge - Merge a pull request (idempotent).
pub async fn merge_pull_request(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MergePullRequestRequest>,
) -> ApiResult<PullRequest> {
    require(&request.pull_request_id, "pull_request_id")?;
    let pr = state
        .service
        .merge_pull_request(&request.pull_request_id)
        .await?;
    Ok(ApiResponse::new(pr))
}

/// POST /pullRequest/reassign - Replace one reviewer.
pub async fn reassign_reviewer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ReassignReviewerRequest>,
) -> ApiResult<Reassignment> {
    require(&request.pull_request_id, "pull_request_id")?;
    require(&request.old_user_id, "old_user_id")?;

    let reassignment = state
        .service
        .reassign_reviewer(&request.pull_request_id, &request.old_user_id)
        .await?;
    Ok(ApiResponse::new(reassignment))
}

/// GET /pullRequest/get?pull_request_id= - Get a pull request.
pub async fn get_pull_request(
    State(state): State<AppState>,
    Query(query): Query<PullRequestQuery>,
) -> ApiResult<PullRequest> {
    require(&query.pull_request_id, "pull_request_id")?;
    let pr = state
        .service
        .get_pull_request(&query.pull_request_id)
        .await?;
    Ok(ApiResponse::new(pr))
}

//! Team API endpoints.

use axum::extract::{Query, State};

use super::{require, ApiJson, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateTeamRequest, Team, TeamQuery};
use crate::AppState;

/// POST /team/add - Create a team and upsert its members.
pub async fn create_team(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTeamRequest>,
) -> ApiResult<Team> {
    require(&request.team_name, "team_name")?;
    let members = request
        .members
        .ok_or_else(|| AppError::Validation("members is required".to_string()))?;

    if members
        .iter()
        .any(|m| m.user_id.trim().is_empty() || m.username.trim().is_empty())
    {
        return Err(AppError::Validation(
            "member.user_id and member.username are required".to_string(),
        ));
    }

    let team = state
        .service
        .create_team(&request.team_name, &members)
        .await?;
    Ok(ApiResponse::created(team))
}

/// GET /team/get?team_name= - Get a team with its roster.
pub async fn get_team(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Team> {
    require(&query.team_name, "team_name")?;
    let team = state.service.get_team(&query.team_name).await?;
    Ok(ApiResponse::new(team))
}

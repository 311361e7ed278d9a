//! User API endpoints.

use axum::extract::{Query, State};

use super::{require, ApiJson, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::models::{SetIsActiveRequest, User, UserQuery, UserReviews};
use crate::AppState;

/// POST /users/setIsActive - Flip a user's active flag.
pub async fn set_user_active(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SetIsActiveRequest>,
) -> ApiResult<User> {
    require(&request.user_id, "user_id")?;
    let is_active = request
        .is_active
        .ok_or_else(|| AppError::Validation("is_active is required".to_string()))?;

    let user = state
        .service
        .set_user_active(&request.user_id, is_active)
        .await?;
    Ok(ApiResponse::new(user))
}

/// GET /users/getReview?user_id= - List pull requests the user reviews.
pub async fn get_user_reviews(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<UserReviews> {
    require(&query.user_id, "user_id")?;
    let reviews = state.service.get_user_reviews(&query.user_id).await?;
    Ok(ApiResponse::new(reviews))
}

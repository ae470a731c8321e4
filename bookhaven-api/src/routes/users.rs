/// User administration
///
/// # Endpoints
///
/// - `GET /v1/users` - All users (admin)
/// - `GET /v1/users/me` - The caller's profile
/// - `GET /v1/users/:id` - One user (admin, or the user themselves)
/// - `DELETE /v1/users/:id` - Delete a user other than the caller (admin)
/// - `POST /v1/users/:id/promote` - Promote a member to staff (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookhaven_shared::{
    auth::{
        authorization::{require_admin, require_ownership},
        middleware::AuthContext,
    },
    models::user::{Promotion, User},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UserList {
    pub total: i64,
    pub users: Vec<User>,
}

pub async fn list_users(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserList>> {
    require_admin(&auth)?;

    let users = User::list(&state.db).await?;
    let total = User::count(&state.db).await?;

    Ok(Json(UserList { total, users }))
}

pub async fn current_user(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    if !auth.is_admin() {
        require_ownership(&auth, id)?;
    }

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// # Errors
///
/// - `400 Bad Request`: an admin tried to delete their own account
/// - `409 Conflict`: the user still owns processed orders, discounts or announcements
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The new role applies from the user's next login or token refresh.
pub async fn promote_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_admin(&auth)?;

    match User::promote_to_staff(&state.db, id).await? {
        Promotion::Promoted(user) => {
            tracing::info!(user_id = %user.id, promoted_by = %auth.user_id, "User promoted to staff");
            Ok(Json(user))
        }
        Promotion::NotFound => Err(ApiError::NotFound("User not found".to_string())),
        Promotion::NotMember(role) => Err(ApiError::BadRequest(format!(
            "Only members can be promoted to staff, this user is {}",
            role
        ))),
    }
}

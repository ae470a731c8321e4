/// Announcement endpoints
///
/// # Endpoints
///
/// - `GET /v1/announcements` - All announcements (public)
/// - `GET /v1/announcements/active` - Active and inside their window (public)
/// - `GET /v1/announcements/:id` - (public)
/// - `POST /v1/announcements` - Publish (admin)
/// - `PUT /v1/announcements/:id` - Replace and reactivate (admin)
/// - `DELETE /v1/announcements/:id` - (admin)

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
    auth::{authorization::require_admin, middleware::AuthContext},
    models::announcement::{Announcement, AnnouncementInput},
    validation::date_window,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "announcement_window"))]
pub struct AnnouncementRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

fn announcement_window(req: &AnnouncementRequest) -> Result<(), ValidationError> {
    date_window(req.start_date, req.end_date)
}

impl AnnouncementRequest {
    fn into_input(self) -> Result<AnnouncementInput, ApiError> {
        let trimmed = AnnouncementRequest {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            ..self
        };
        trimmed.validate()?;

        Ok(AnnouncementInput {
            title: trimmed.title,
            content: trimmed.content,
            start_date: trimmed.start_date,
            end_date: trimmed.end_date,
        })
    }
}

fn announcement_not_found() -> ApiError {
    ApiError::NotFound("Announcement not found".to_string())
}

/// # Errors
///
/// - `404 Not Found`: there are no announcements at all
pub async fn list_announcements(State(state): State<AppState>) -> ApiResult<Json<Vec<Announcement>>> {
    let announcements = Announcement::list(&state.db).await?;
    if announcements.is_empty() {
        return Err(ApiError::NotFound("No announcements found".to_string()));
    }

    Ok(Json(announcements))
}

pub async fn list_active_announcements(State(state): State<AppState>) -> ApiResult<Json<Vec<Announcement>>> {
    Ok(Json(Announcement::list_current(&state.db).await?))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Announcement>> {
    let announcement = Announcement::find_by_id(&state.db, id)
        .await?
        .ok_or_else(announcement_not_found)?;

    Ok(Json(announcement))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AnnouncementRequest>,
) -> ApiResult<(StatusCode, Json<Announcement>)> {
    require_admin(&auth)?;
    let input = req.into_input()?;

    let announcement = Announcement::create(&state.db, auth.user_id, input).await?;
    tracing::info!(announcement_id = %announcement.id, "Announcement published");

    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<AnnouncementRequest>,
) -> ApiResult<Json<Announcement>> {
    require_admin(&auth)?;
    let input = req.into_input()?;

    let announcement = Announcement::replace(&state.db, id, input)
        .await?
        .ok_or_else(announcement_not_found)?;

    Ok(Json(announcement))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if !Announcement::delete(&state.db, id).await? {
        return Err(announcement_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

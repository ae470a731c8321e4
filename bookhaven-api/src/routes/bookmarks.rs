/// Bookmark endpoints; members only, and every route is scoped to the
/// caller's own bookmarks.
///
/// # Endpoints
///
/// - `GET /v1/bookmarks` - Bookmarks with book and stock
/// - `GET /v1/bookmarks/count`
/// - `GET /v1/bookmarks/:id`
/// - `POST /v1/bookmarks` - `{"book_id": "..."}`
/// - `PUT /v1/bookmarks/:id` - Point the bookmark at another book
/// - `DELETE /v1/bookmarks/:id`

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
    auth::{authorization::require_member, middleware::AuthContext},
    models::{
        book::Book,
        bookmark::{Bookmark, BookmarkWithBook},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct BookmarkRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BookmarkCount {
    pub count: i64,
}

fn bookmark_not_found() -> ApiError {
    ApiError::NotFound("Bookmark not found".to_string())
}

async fn ensure_book_exists(state: &AppState, book_id: Uuid) -> ApiResult<()> {
    if Book::exists(&state.db, book_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Book not found".to_string()))
    }
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<BookmarkWithBook>>> {
    require_member(&auth)?;
    let bookmarks = Bookmark::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(Bookmark::with_books(&state.db, bookmarks).await?))
}

pub async fn count_bookmarks(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<BookmarkCount>> {
    require_member(&auth)?;
    Ok(Json(BookmarkCount {
        count: Bookmark::count_for_user(&state.db, auth.user_id).await?,
    }))
}

pub async fn get_bookmark(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Bookmark>> {
    require_member(&auth)?;
    let bookmark = Bookmark::find_own(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(bookmark_not_found)?;

    Ok(Json(bookmark))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<BookmarkRequest>,
) -> ApiResult<(StatusCode, Json<Bookmark>)> {
    require_member(&auth)?;
    ensure_book_exists(&state, req.book_id).await?;

    let bookmark = Bookmark::create(&state.db, auth.user_id, req.book_id).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<BookmarkRequest>,
) -> ApiResult<Json<Bookmark>> {
    require_member(&auth)?;
    ensure_book_exists(&state, req.book_id).await?;

    let bookmark = Bookmark::repoint_own(&state.db, id, auth.user_id, req.book_id)
        .await?
        .ok_or_else(bookmark_not_found)?;

    Ok(Json(bookmark))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_member(&auth)?;
    if !Bookmark::delete_own(&state.db, id, auth.user_id).await? {
        return Err(bookmark_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Review endpoints
///
/// Only customers who bought a book may review it.
///
/// # Endpoints
///
/// - `GET /v1/reviews` - All reviews (public)
/// - `GET /v1/reviews/:id` - One review (public)
/// - `GET /v1/books/:id/reviews` - Reviews of a book (public)
/// - `POST /v1/reviews` - Review a purchased book (member)
/// - `PUT /v1/reviews/:id` - Rewrite the caller's review (member)
/// - `DELETE /v1/reviews/:id` - Delete the caller's review

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
        purchase::Purchase,
        review::{CreateReview, Review},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub book_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: String,
}

fn not_yours() -> ApiError {
    ApiError::NotFound("Review not found or not yours".to_string())
}

pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(Review::list(&state.db).await?))
}

pub async fn get_review(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Review>> {
    let review = Review::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;

    Ok(Json(review))
}

pub async fn list_book_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Review>>> {
    if !Book::exists(&state.db, id).await? {
        return Err(ApiError::NotFound("Book not found".to_string()));
    }

    Ok(Json(Review::list_for_book(&state.db, id).await?))
}

/// # Errors
///
/// - `404 Not Found`: unknown book
/// - `400 Bad Request`: the caller never bought the book
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    require_member(&auth)?;
    req.validate()?;

    if !Book::exists(&state.db, req.book_id).await? {
        return Err(ApiError::NotFound("Book not found".to_string()));
    }

    if !Purchase::exists(&state.db, auth.user_id, req.book_id).await? {
        return Err(ApiError::BadRequest(
            "You can only review books you have purchased".to_string(),
        ));
    }

    let review = Review::create(
        &state.db,
        CreateReview {
            user_id: auth.user_id,
            book_id: req.book_id,
            rating: req.rating,
            comment: req.comment.trim().to_string(),
            is_verified_purchase: true,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<Json<Review>> {
    require_member(&auth)?;
    req.validate()?;

    let review = Review::update_own(&state.db, id, auth.user_id, req.rating, req.comment.trim().to_string())
        .await?
        .ok_or_else(not_yours)?;

    Ok(Json(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Review::delete_own(&state.db, id, auth.user_id).await? {
        return Err(not_yours());
    }

    Ok(StatusCode::NO_CONTENT)
}

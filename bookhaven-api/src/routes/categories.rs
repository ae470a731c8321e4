/// Category endpoints
///
/// # Endpoints
///
/// - `GET /v1/categories` - All categories (public)
/// - `GET /v1/categories/:id` - One category (public)
/// - `GET /v1/categories/:id/books` - Books in a category (public)
/// - `GET /v1/books/:id/categories` - Categories of a book (public)
/// - `POST /v1/categories` - Create (admin)
/// - `PUT /v1/categories/:id` - Update name and/or description (admin)
/// - `DELETE /v1/categories/:id` - Delete (admin)
/// - `PUT /v1/books/:id/categories` - Link a book to categories (admin)

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
    models::{
        book::Book,
        category::{Assignment, Category, CreateCategory, UpdateCategory},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignCategoriesRequest {
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AssignCategoriesResponse {
    pub book_id: Uuid,
    /// Links that did not exist before
    pub assigned: u64,
    pub categories: Vec<Category>,
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(Category::list(&state.db).await?))
}

pub async fn get_category(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Category>> {
    let category = Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

pub async fn list_category_books(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Book>>> {
    if Category::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    Ok(Json(Category::books(&state.db, id).await?))
}

pub async fn list_book_categories(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Category>>> {
    if !Book::exists(&state.db, id).await? {
        return Err(ApiError::NotFound("Book not found".to_string()));
    }

    Ok(Json(Category::for_book(&state.db, id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    require_admin(&auth)?;
    req.validate()?;

    let category = Category::create(
        &state.db,
        CreateCategory {
            name: req.name.trim().to_string(),
            description: req.description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    require_admin(&auth)?;
    req.validate()?;

    let category = Category::update(
        &state.db,
        id,
        UpdateCategory {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if !Category::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// - `400 Bad Request`: empty list or unknown category ids; nothing is linked
/// - `404 Not Found`: unknown book
pub async fn assign_categories(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignCategoriesRequest>,
) -> ApiResult<Json<AssignCategoriesResponse>> {
    require_admin(&auth)?;

    if req.category_ids.is_empty() {
        return Err(ApiError::BadRequest("At least one category id is required".to_string()));
    }

    match Category::assign_to_book(&state.db, id, &req.category_ids).await? {
        Assignment::Assigned(assigned) => Ok(Json(AssignCategoriesResponse {
            book_id: id,
            assigned,
            categories: Category::for_book(&state.db, id).await?,
        })),
        Assignment::BookNotFound => Err(ApiError::NotFound("Book not found".to_string())),
        Assignment::UnknownCategories(missing) => {
            let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
            Err(ApiError::BadRequest(format!(
                "Unknown category ids: {}",
                ids.join(", ")
            )))
        }
    }
}

/// Catalog endpoints
///
/// # Endpoints
///
/// - `GET /v1/books?start=0&length=10&draw=1&search=dune` - Paged search (public)
/// - `GET /v1/books/:id` - Book with inventory (public)
/// - `GET /v1/books/low-stock` - Inventory at or below reorder threshold (admin)
/// - `POST /v1/books` - Create a book and its inventory (admin)
/// - `PUT /v1/books/:id` - Partial update of book and inventory (admin)
/// - `DELETE /v1/books/:id` - Delete a book (admin)
///
/// The listing answers in the shape grid widgets expect:
///
/// ```json
/// { "draw": 1, "records_total": 120, "records_filtered": 3, "data": [ ... ] }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bookhaven_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::{
        book::{Book, BookDetail, BookPage, BookSearch, CreateBook, UpdateBook},
        inventory::Inventory,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PAGE_LENGTH: i64 = 10;
pub const MAX_PAGE_LENGTH: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    /// Echoed back unchanged
    #[serde(default)]
    pub draw: i64,
    #[serde(default)]
    pub start: i64,
    pub length: Option<i64>,
    pub search: Option<String>,
}

impl ListBooksQuery {
    fn to_search(&self) -> BookSearch {
        BookSearch {
            start: self.start.max(0),
            length: self
                .length
                .unwrap_or(DEFAULT_PAGE_LENGTH)
                .clamp(1, MAX_PAGE_LENGTH),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookListResponse {
    pub draw: i64,
    #[serde(flatten)]
    pub page: BookPage,
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> ApiResult<Json<BookListResponse>> {
    let page = Book::search(&state.db, &query.to_search()).await?;

    Ok(Json(BookListResponse {
        draw: query.draw,
        page,
    }))
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<BookDetail>> {
    let book = Book::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;

    Ok(Json(book))
}

pub async fn list_low_stock(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Vec<Inventory>>> {
    require_admin(&auth)?;
    Ok(Json(Inventory::list_low_stock(&state.db).await?))
}

pub async fn create_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateBook>,
) -> ApiResult<(StatusCode, Json<BookDetail>)> {
    require_admin(&auth)?;
    req.validate()?;

    let book = Book::create(&state.db, req).await?;
    tracing::info!(book_id = %book.book.id, isbn = %book.book.isbn, "Book created");

    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBook>,
) -> ApiResult<Json<BookDetail>> {
    require_admin(&auth)?;
    req.validate()?;

    let book = Book::update(&state.db, id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;

    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if !Book::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Book not found".to_string()));
    }

    tracing::info!(book_id = %id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Shopping cart endpoints
///
/// Every caller has at most one open cart; it is created by the first
/// `POST /v1/cart/items` and closed when an order placed from it is completed.
///
/// # Endpoints
///
/// - `GET /v1/cart` - Open cart with lines and totals
/// - `DELETE /v1/cart` - Discard the open cart
/// - `POST /v1/cart/items` - Add a book (`quantity` defaults to 1)
/// - `PUT /v1/cart/items/:id` - Change a line's quantity
/// - `DELETE /v1/cart/items/:id` - Remove a line
/// - `GET /v1/cart/purchases` - Purchase history of every customer (admin)

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
        cart::{CartContents, CartItem, ShoppingCart},
        purchase::{CustomerPurchases, Purchase},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub book_id: Uuid,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct PurchasesResponse {
    pub users: Vec<CustomerPurchases>,
}

pub async fn get_cart(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<CartContents>> {
    let cart = ShoppingCart::contents(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No cart found".to_string()))?;

    Ok(Json(cart))
}

pub async fn add_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<CartItem>)> {
    req.validate()?;

    if !Book::exists(&state.db, req.book_id).await? {
        return Err(ApiError::NotFound("Book not found".to_string()));
    }

    let item = ShoppingCart::add_item(&state.db, auth.user_id, req.book_id, req.quantity).await?;
    tracing::debug!(user_id = %auth.user_id, book_id = %req.book_id, quantity = item.quantity, "Cart line saved");

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<Json<CartItem>> {
    req.validate()?;

    let item = ShoppingCart::update_item_quantity(&state.db, auth.user_id, id, req.quantity)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

    Ok(Json(item))
}

pub async fn remove_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !ShoppingCart::remove_item(&state.db, auth.user_id, id).await? {
        return Err(ApiError::NotFound("Cart item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_cart(State(state): State<AppState>, auth: AuthContext) -> ApiResult<StatusCode> {
    if !ShoppingCart::cancel(&state.db, auth.user_id).await? {
        return Err(ApiError::NotFound("No cart found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, "Cart cancelled");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_purchases(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<PurchasesResponse>> {
    require_admin(&auth)?;

    Ok(Json(PurchasesResponse {
        users: Purchase::grouped_by_customer(&state.db).await?,
    }))
}

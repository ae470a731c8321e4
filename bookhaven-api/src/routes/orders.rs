/// Order endpoints
///
/// # Endpoints
///
/// - `POST /v1/orders` - Place an order from the caller's open cart
/// - `GET /v1/orders` - Every order with its lines (admin, staff)
/// - `GET /v1/orders/mine` - The caller's orders in any state
/// - `GET /v1/orders/history` - The caller's completed orders
/// - `GET /v1/orders/events` - Server-Sent Events stream of placed orders (admin, staff)
/// - `GET /v1/orders/:id` - One order (store staff, or its owner)
/// - `POST /v1/orders/:id/cancel` - Cancel one of the caller's pending orders
/// - `POST /v1/orders/claims/:code/process` - Mark ready for pickup (admin, staff)
/// - `POST /v1/orders/claims/:code/complete` - Hand over a ready order (admin, staff)
///
/// # Event stream
///
/// ```text
/// event: order_placed
/// id: 0b5c...
/// data: {"message":"New order placed by member ...","order_id":"...","user_id":"...","books":[...]}
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    services::{notifier::OrderPlaced, orders},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use bookhaven_shared::{
    auth::{
        authorization::{require_member, require_store_staff},
        middleware::AuthContext,
    },
    models::order::{Order, OrderItemDetail, OrderStatus, OrderWithItems},
};
use futures::stream::Stream;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt as _,
};
use uuid::Uuid;

/// Summary returned after checkout
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: Uuid,
    pub claim_code: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub discount_applied: bool,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub items: Vec<OrderItemDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderHistoryResponse {
    pub completed_orders: i64,
    pub orders: Vec<OrderWithItems>,
}

/// Places an order from the open cart.
///
/// Bulk discount: 5% from 5 books, 15% from 10 books.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not a member
/// - `400 Bad Request`: "No cart found" or "Your cart is empty"
pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<(StatusCode, Json<PlaceOrderResponse>)> {
    require_member(&auth)?;
    let placed = orders::place_order(&state, auth.user_id).await?;
    let order = placed.order;

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            order_id: order.id,
            claim_code: order.claim_code,
            status: order.status,
            total_amount: order.total_amount,
            discount_applied: order.discount_applied,
            discount_amount: order.discount_amount,
            final_amount: order.final_amount,
            items: placed.items,
        }),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<OrderWithItems>>> {
    require_store_staff(&auth)?;
    Ok(Json(Order::list_all(&state.db).await?))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<OrderWithItems>>> {
    Ok(Json(Order::list_for_user(&state.db, auth.user_id).await?))
}

pub async fn order_history(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<OrderHistoryResponse>> {
    let orders = Order::history(&state.db, auth.user_id).await?;

    Ok(Json(OrderHistoryResponse {
        completed_orders: orders.len() as i64,
        orders,
    }))
}

/// Members only see their own orders; anything else is a 404.
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderWithItems>> {
    let order = Order::find_by_id(&state.db, id)
        .await?
        .filter(|o| auth.is_store_staff() || o.order.user_id == auth.user_id)
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    Ok(Json(order))
}

/// # Errors
///
/// - `404 Not Found`: unknown order or someone else's
/// - `400 Bad Request`: the order is no longer pending
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelOrderRequest>>,
) -> ApiResult<Json<CancelOrderResponse>> {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let order = Order::cancel(&state.db, id, auth.user_id).await?;
    tracing::info!(order_id = %order.id, reason = reason.as_deref().unwrap_or(""), "Order cancelled");

    Ok(Json(CancelOrderResponse { order, reason }))
}

pub async fn process_claim(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
) -> ApiResult<Json<Order>> {
    require_store_staff(&auth)?;

    let order = Order::process_claim(&state.db, &code, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid or already processed claim code".to_string()))?;

    tracing::info!(order_id = %order.id, processed_by = %auth.user_id, "Claim processed");
    Ok(Json(order))
}

/// # Errors
///
/// - `404 Not Found`: unknown claim code
/// - `400 Bad Request`: the order is not ready for pickup
pub async fn complete_claim(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
) -> ApiResult<Json<OrderWithItems>> {
    require_store_staff(&auth)?;

    let order = orders::complete_claim(&state, &code).await?;
    Ok(Json(order))
}

/// Streams `order_placed` events until the client disconnects.
///
/// A client that falls too far behind skips the events it missed.
pub async fn order_events(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    require_store_staff(&auth)?;

    tracing::info!(user_id = %auth.user_id, "Order event stream opened");

    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(|message| match message {
        Ok(event) => match to_sse_event(&event) {
            Ok(sse) => Some(Ok::<Event, Infallible>(sse)),
            Err(e) => {
                tracing::error!(error = %e, order_id = %event.order_id, "Failed to encode order event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Order event subscriber lagged");
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(25))))
}

fn to_sse_event(event: &OrderPlaced) -> Result<Event, axum::Error> {
    Event::default()
        .event("order_placed")
        .id(event.order_id.to_string())
        .json_data(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_response_includes_reason_only_when_given() {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_date: chrono::Utc::now(),
            total_amount: Decimal::new(1000, 2),
            discount_applied: false,
            discount_amount: Decimal::ZERO,
            final_amount: Decimal::new(1000, 2),
            status: OrderStatus::Cancelled,
            claim_code: "QWERTY12".to_string(),
            updated_at: Some(chrono::Utc::now()),
            pickup_date: None,
            processed_by: None,
        };

        let json = serde_json::to_value(CancelOrderResponse {
            order: order.clone(),
            reason: None,
        })
        .unwrap();
        assert_eq!(json["status"], "cancelled");
        assert!(json.get("reason").is_none());

        let json = serde_json::to_value(CancelOrderResponse {
            order,
            reason: Some("Changed my mind".to_string()),
        })
        .unwrap();
        assert_eq!(json["reason"], "Changed my mind");
    }

    #[test]
    fn test_sse_event_encodes() {
        let event = OrderPlaced {
            message: "New order".to_string(),
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            books: vec![],
        };
        assert!(to_sse_event(&event).is_ok());
    }
}

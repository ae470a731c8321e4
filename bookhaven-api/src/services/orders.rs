//! Order workflows that reach past the database.
//!
//! The models own the transactional part; these functions add what happens
//! after commit: the `order_placed` broadcast and customer emails. Neither
//! side effect can fail the request.

use bookhaven_shared::models::{
    order::{Order, OrderError, OrderWithItems, PlacedOrder},
    user::User,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::services::{
    email::{dispatch, order_completed_email, order_confirmation_email},
    notifier::OrderPlaced,
};

/// Turns the member's open cart into a pending order, then notifies staff
/// and emails the confirmation.
pub async fn place_order(state: &AppState, user_id: Uuid) -> Result<PlacedOrder, OrderError> {
    let placed = Order::place(&state.db, user_id).await?;

    tracing::info!(
        order_id = %placed.order.id,
        user_id = %user_id,
        items = placed.items.len(),
        final_amount = %placed.order.final_amount,
        "Order placed"
    );

    let receivers = state.notifier.publish(OrderPlaced::from_placed(&placed));
    tracing::debug!(order_id = %placed.order.id, receivers, "Published order_placed");

    match order_confirmation_email(&placed.customer_email, &placed.order, &placed.items) {
        Ok(email) => dispatch(state.mailer.clone(), email),
        Err(e) => {
            tracing::warn!(error = %e, order_id = %placed.order.id, "Failed to render confirmation email")
        }
    }

    Ok(placed)
}

/// Hands a ready order over to the customer and emails the receipt.
pub async fn complete_claim(state: &AppState, claim_code: &str) -> Result<OrderWithItems, OrderError> {
    let completed = Order::complete_claim(&state.db, claim_code).await?;

    tracing::info!(
        order_id = %completed.order.id,
        claim_code = %completed.order.claim_code,
        "Order completed"
    );

    match User::find_by_id(&state.db, completed.order.user_id).await {
        Ok(Some(customer)) => {
            match order_completed_email(&customer.email, &completed.order, &completed.order_items) {
                Ok(email) => dispatch(state.mailer.clone(), email),
                Err(e) => {
                    tracing::warn!(error = %e, order_id = %completed.order.id, "Failed to render completion email")
                }
            }
        }
        Ok(None) => {
            tracing::warn!(order_id = %completed.order.id, "Customer missing, completion email skipped")
        }
        Err(e) => {
            tracing::warn!(error = %e, order_id = %completed.order.id, "Could not load customer for completion email")
        }
    }

    Ok(completed)
}

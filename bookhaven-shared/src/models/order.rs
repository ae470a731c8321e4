/// Orders, order lines and the pickup lifecycle
///
/// ```text
/// pending ──process claim──▶ ready_for_pickup ──complete──▶ completed
///    │
///    └──cancel (owner)──▶ cancelled
/// ```
///
/// Placing an order converts the caller's open cart in a single transaction:
/// the order and its lines are written, stock is decremented, purchases are
/// recorded and the cart is emptied. Any failure rolls all of it back.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE order_status AS ENUM ('pending', 'ready_for_pickup', 'completed', 'cancelled');
///
/// CREATE TABLE orders (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     order_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     total_amount NUMERIC(12, 2) NOT NULL,
///     discount_applied BOOLEAN NOT NULL DEFAULT FALSE,
///     discount_amount NUMERIC(12, 2) NOT NULL DEFAULT 0,
///     final_amount NUMERIC(12, 2) NOT NULL,
///     status order_status NOT NULL DEFAULT 'pending',
///     claim_code VARCHAR(8) NOT NULL UNIQUE,
///     updated_at TIMESTAMPTZ,
///     pickup_date TIMESTAMPTZ,
///     processed_by UUID REFERENCES users(id) ON DELETE RESTRICT
/// );
///
/// CREATE TABLE order_items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE RESTRICT,
///     quantity INTEGER NOT NULL CHECK (quantity >= 1),
///     price_at_order NUMERIC(12, 2) NOT NULL,
///     subtotal NUMERIC(12, 2) NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bookhaven_shared::models::order::Order;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, member_id: Uuid, staff_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let placed = Order::place(&pool, member_id).await?;
/// println!("Claim code {}", placed.order.claim_code);
///
/// Order::process_claim(&pool, &placed.order.claim_code, staff_id).await?;
/// Order::complete_claim(&pool, &placed.order.claim_code).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::cart::ShoppingCart;
use super::inventory::Inventory;
use super::purchase::Purchase;
use crate::pricing::{generate_claim_code, line_subtotal, normalize_claim_code, price_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    ReadyForPickup,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled orders never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub discount_applied: bool,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub status: OrderStatus,
    pub claim_code: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub pickup_date: Option<DateTime<Utc>>,
    /// Staff member who processed the claim
    pub processed_by: Option<Uuid>,
}

/// Order line with the title and author of its book
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItemDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub author_name: String,
    pub quantity: i32,
    pub price_at_order: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItemDetail>,
}

/// A freshly placed order, plus the buyer's email for notifications
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
    pub customer_email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("No cart found")]
    NoCart,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Order not found")]
    NotFound,

    #[error("Order is {actual}, expected {expected}")]
    InvalidState {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const ORDER_COLUMNS: &str = "id, user_id, order_date, total_amount, discount_applied, \
    discount_amount, final_amount, status, claim_code, updated_at, pickup_date, processed_by";

const ITEM_DETAIL_SELECT: &str = "SELECT oi.id, oi.order_id, oi.book_id, b.title AS book_title, \
    b.author_name, oi.quantity, oi.price_at_order, oi.subtotal \
    FROM order_items oi JOIN books b ON b.id = oi.book_id";

impl Order {
    /// Converts the user's open cart into a pending order.
    ///
    /// # Errors
    ///
    /// - `OrderError::NoCart` when the user has no open cart
    /// - `OrderError::EmptyCart` when the cart has no lines
    /// - `OrderError::Database` on any query failure; nothing is written
    pub async fn place(pool: &PgPool, user_id: Uuid) -> Result<PlacedOrder, OrderError> {
        let mut tx = pool.begin().await?;

        let cart = ShoppingCart::lock_open(&mut *tx, user_id)
            .await?
            .ok_or(OrderError::NoCart)?;

        let lines = ShoppingCart::lines(&mut *tx, cart.id).await?;
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let totals = price_order(lines.iter().map(|line| (line.price, line.quantity)));
        let claim_code = unused_claim_code(&mut *tx).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, total_amount, discount_applied, discount_amount,
                                 final_amount, claim_code)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(totals.total_amount)
        .bind(totals.discount_applied())
        .bind(totals.discount_amount)
        .bind(totals.final_amount)
        .bind(&claim_code)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let subtotal = line_subtotal(line.price, line.quantity);
            let item_id: Uuid = sqlx::query_scalar(
                "INSERT INTO order_items (order_id, book_id, quantity, price_at_order, subtotal)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(order.id)
            .bind(line.book_id)
            .bind(line.quantity)
            .bind(line.price)
            .bind(subtotal)
            .fetch_one(&mut *tx)
            .await?;

            Inventory::decrement(&mut *tx, line.book_id, line.quantity).await?;
            Purchase::record(&mut *tx, user_id, line.book_id).await?;

            items.push(OrderItemDetail {
                id: item_id,
                order_id: order.id,
                book_id: line.book_id,
                book_title: line.title.clone(),
                author_name: line.author_name.clone(),
                quantity: line.quantity,
                price_at_order: line.price,
                subtotal,
            });
        }

        ShoppingCart::clear_items(&mut *tx, cart.id).await?;

        let customer_email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PlacedOrder {
            order,
            items,
            customer_email,
        })
    }

    /// Cancels one of the caller's own pending orders.
    pub async fn cancel(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Order, OrderError> {
        let mut tx = pool.begin().await?;

        let current: Option<OrderStatus> = sqlx::query_scalar(
            "SELECT status FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match current {
            None => return Err(OrderError::NotFound),
            Some(OrderStatus::Pending) => {}
            Some(actual) => {
                return Err(OrderError::InvalidState {
                    expected: OrderStatus::Pending,
                    actual,
                })
            }
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'cancelled', updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Marks a pending order ready for pickup and records who processed it.
    ///
    /// Returns `None` for unknown or already processed claim codes.
    pub async fn process_claim(
        pool: &PgPool,
        claim_code: &str,
        staff_id: Uuid,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders
             SET status = 'ready_for_pickup', processed_by = $2,
                 pickup_date = NOW(), updated_at = NOW()
             WHERE claim_code = $1 AND status = 'pending'
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(normalize_claim_code(claim_code))
        .bind(staff_id)
        .fetch_optional(pool)
        .await
    }

    /// Completes a ready order and closes the customer's open cart.
    pub async fn complete_claim(pool: &PgPool, claim_code: &str) -> Result<OrderWithItems, OrderError> {
        let mut tx = pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE claim_code = $1 FOR UPDATE"
        ))
        .bind(normalize_claim_code(claim_code))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OrderError::NotFound)?;

        if order.status != OrderStatus::ReadyForPickup {
            return Err(OrderError::InvalidState {
                expected: OrderStatus::ReadyForPickup,
                actual: order.status,
            });
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'completed', updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        ShoppingCart::mark_paid(&mut *tx, order.user_id).await?;
        let order_items = items_for(&mut *tx, &[order.id]).await?;

        tx.commit().await?;
        Ok(OrderWithItems { order, order_items })
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<OrderWithItems>, sqlx::Error> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let mut conn = pool.acquire().await?;
        let order_items = items_for(&mut *conn, &[order.id]).await?;
        Ok(Some(OrderWithItems { order, order_items }))
    }

    /// Every order, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<OrderWithItems>, sqlx::Error> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_date DESC"
        ))
        .fetch_all(pool)
        .await?;

        with_items(pool, orders).await
    }

    /// A user's orders in any state, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<OrderWithItems>, sqlx::Error> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        with_items(pool, orders).await
    }

    /// A user's completed orders, newest first
    pub async fn history(pool: &PgPool, user_id: Uuid) -> Result<Vec<OrderWithItems>, sqlx::Error> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1 AND status = 'completed'
             ORDER BY order_date DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        with_items(pool, orders).await
    }
}

async fn unused_claim_code(conn: &mut PgConnection) -> Result<String, sqlx::Error> {
    loop {
        let code = generate_claim_code();
        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE claim_code = $1)")
            .bind(&code)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(code);
        }
    }
}

async fn items_for(conn: &mut PgConnection, order_ids: &[Uuid]) -> Result<Vec<OrderItemDetail>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemDetail>(&format!(
        "{ITEM_DETAIL_SELECT} WHERE oi.order_id = ANY($1) ORDER BY b.title, oi.id"
    ))
    .bind(order_ids)
    .fetch_all(conn)
    .await
}

async fn with_items(pool: &PgPool, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, sqlx::Error> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut conn = pool.acquire().await?;
    let items = items_for(&mut *conn, &ids).await?;

    Ok(group_items(orders, items))
}

fn group_items(orders: Vec<Order>, items: Vec<OrderItemDetail>) -> Vec<OrderWithItems> {
    let mut by_order: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|order| OrderWithItems {
            order_items: by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_date: Utc::now(),
            total_amount: Decimal::new(4000, 2),
            discount_applied: false,
            discount_amount: Decimal::ZERO,
            final_amount: Decimal::new(4000, 2),
            status,
            claim_code: "AB12CD34".to_string(),
            updated_at: None,
            pickup_date: None,
            processed_by: None,
        }
    }

    fn item(order_id: Uuid, title: &str) -> OrderItemDetail {
        OrderItemDetail {
            id: Uuid::new_v4(),
            order_id,
            book_id: Uuid::new_v4(),
            book_title: title.to_string(),
            author_name: "Ursula K. Le Guin".to_string(),
            quantity: 1,
            price_at_order: Decimal::new(2000, 2),
            subtotal: Decimal::new(2000, 2),
        }
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(OrderStatus::ReadyForPickup.as_str(), "ready_for_pickup");
        assert_eq!(
            serde_json::to_string(&OrderStatus::ReadyForPickup).unwrap(),
            "\"ready_for_pickup\""
        );
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_group_items_keeps_order_sequence() {
        let first = order(OrderStatus::Pending);
        let second = order(OrderStatus::Completed);
        let items = vec![
            item(second.id, "The Dispossessed"),
            item(first.id, "A Wizard of Earthsea"),
            item(second.id, "The Lathe of Heaven"),
        ];

        let grouped = group_items(vec![first.clone(), second.clone()], items);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].order.id, first.id);
        assert_eq!(grouped[0].order_items.len(), 1);
        assert_eq!(grouped[1].order_items.len(), 2);
    }

    #[test]
    fn test_order_without_items_gets_empty_list() {
        let grouped = group_items(vec![order(OrderStatus::Cancelled)], Vec::new());
        assert!(grouped[0].order_items.is_empty());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = OrderError::InvalidState {
            expected: OrderStatus::Pending,
            actual: OrderStatus::Completed,
        };
        assert_eq!(err.to_string(), "Order is completed, expected pending");
    }

    #[test]
    fn test_order_with_items_serializes_flat() {
        let o = order(OrderStatus::Pending);
        let json = serde_json::to_value(OrderWithItems {
            order_items: vec![item(o.id, "Tehanu")],
            order: o,
        })
        .unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["claim_code"], "AB12CD34");
        assert_eq!(json["order_items"][0]["book_title"], "Tehanu");
    }
}

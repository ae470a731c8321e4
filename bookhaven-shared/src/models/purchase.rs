/// Purchase history
///
/// One row per (user, book) the first time that user orders the book. Rows
/// are never updated or deleted by the application; they gate reviews.
///
/// ```sql
/// CREATE TABLE purchases (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     purchase_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, book_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub purchase_date: DateTime<Utc>,
}

/// Purchase joined with the book bought
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PurchasedBook {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub title: String,
    pub author_name: String,
    pub price: Decimal,
    pub cover_image_url: Option<String>,
}

/// All purchases of one customer
#[derive(Debug, Clone, Serialize)]
pub struct CustomerPurchases {
    pub user_id: Uuid,
    pub purchases: Vec<PurchasedBook>,
}

impl Purchase {
    /// Records that the user bought the book; a repeat purchase is a no-op.
    ///
    /// Returns true when a new row was written.
    pub async fn record(conn: &mut PgConnection, user_id: Uuid, book_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO purchases (user_id, book_id) VALUES ($1, $2)
             ON CONFLICT (user_id, book_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, user_id: Uuid, book_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(pool)
        .await
    }

    /// Every purchase grouped by customer
    pub async fn grouped_by_customer(pool: &PgPool) -> Result<Vec<CustomerPurchases>, sqlx::Error> {
        let rows = sqlx::query_as::<_, PurchasedBook>(
            "SELECT p.id, p.user_id, p.book_id, p.purchase_date,
                    b.title, b.author_name, b.price, b.cover_image_url
             FROM purchases p
             JOIN books b ON b.id = p.book_id
             ORDER BY p.user_id, p.purchase_date DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(group_by_customer(rows))
    }
}

/// Groups rows already sorted by user id.
fn group_by_customer(rows: Vec<PurchasedBook>) -> Vec<CustomerPurchases> {
    let mut groups: Vec<CustomerPurchases> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some(group) if group.user_id == row.user_id => group.purchases.push(row),
            _ => groups.push(CustomerPurchases {
                user_id: row.user_id,
                purchases: vec![row],
            }),
        }
    }
    groups
}

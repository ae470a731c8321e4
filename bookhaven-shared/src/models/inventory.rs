/// Stock levels
///
/// One row per book. Quantities never go negative: an order for more copies
/// than are on the shelf empties the stock instead of failing, and
/// `is_available` always mirrors `quantity_in_stock > 0`.
///
/// ```sql
/// CREATE TABLE inventory (
///     book_id UUID PRIMARY KEY REFERENCES books(id) ON DELETE CASCADE,
///     quantity_in_stock INTEGER NOT NULL DEFAULT 0 CHECK (quantity_in_stock >= 0),
///     reorder_threshold INTEGER NOT NULL DEFAULT 0,
///     is_available BOOLEAN NOT NULL DEFAULT FALSE,
///     last_stocked_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Inventory {
    pub book_id: Uuid,
    pub quantity_in_stock: i32,
    pub reorder_threshold: i32,
    pub is_available: bool,
    pub last_stocked_at: DateTime<Utc>,
}

impl Inventory {
    /// Books at or below their reorder threshold
    pub fn needs_reorder(&self) -> bool {
        self.quantity_in_stock <= self.reorder_threshold
    }

    pub(crate) async fn create(
        conn: &mut PgConnection,
        book_id: Uuid,
        quantity: i32,
        reorder_threshold: i32,
    ) -> Result<Self, sqlx::Error> {
        let quantity = quantity.max(0);

        sqlx::query_as::<_, Inventory>(
            r#"
            INSERT INTO inventory (book_id, quantity_in_stock, reorder_threshold, is_available)
            VALUES ($1, $2, $3, $2 > 0)
            RETURNING book_id, quantity_in_stock, reorder_threshold, is_available, last_stocked_at
            "#,
        )
        .bind(book_id)
        .bind(quantity)
        .bind(reorder_threshold)
        .fetch_one(conn)
        .await
    }

    /// Sets stock and/or threshold and bumps `last_stocked_at`.
    pub(crate) async fn restock(
        conn: &mut PgConnection,
        book_id: Uuid,
        quantity: Option<i32>,
        reorder_threshold: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventory
            SET quantity_in_stock = COALESCE($2, quantity_in_stock),
                reorder_threshold = COALESCE($3, reorder_threshold),
                is_available = COALESCE($2, quantity_in_stock) > 0,
                last_stocked_at = NOW()
            WHERE book_id = $1
            RETURNING book_id, quantity_in_stock, reorder_threshold, is_available, last_stocked_at
            "#,
        )
        .bind(book_id)
        .bind(quantity.map(|q| q.max(0)))
        .bind(reorder_threshold)
        .fetch_optional(conn)
        .await
    }

    /// Removes `quantity` copies from stock, stopping at zero.
    pub async fn decrement(
        conn: &mut PgConnection,
        book_id: Uuid,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity_in_stock = GREATEST(quantity_in_stock - $2, 0),
                is_available = quantity_in_stock - $2 > 0
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .bind(quantity)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_book(pool: &PgPool, book_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Inventory>(
            "SELECT book_id, quantity_in_stock, reorder_threshold, is_available, last_stocked_at
             FROM inventory WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_optional(pool)
        .await
    }

    /// Books whose stock has fallen to or below their reorder threshold
    pub async fn list_low_stock(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Inventory>(
            "SELECT book_id, quantity_in_stock, reorder_threshold, is_available, last_stocked_at
             FROM inventory
             WHERE quantity_in_stock <= reorder_threshold
             ORDER BY quantity_in_stock, book_id",
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_reorder() {
        let mut stock = Inventory {
            book_id: Uuid::new_v4(),
            quantity_in_stock: 5,
            reorder_threshold: 2,
            is_available: true,
            last_stocked_at: Utc::now(),
        };
        assert!(!stock.needs_reorder());

        stock.quantity_in_stock = 2;
        assert!(stock.needs_reorder());
    }
}

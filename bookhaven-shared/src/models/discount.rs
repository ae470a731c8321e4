/// Time-boxed percentage discounts on individual books
///
/// A discount is shown to shoppers while it is active, flagged on sale and
/// `start_date <= now <= end_date`. The worker deactivates discounts whose
/// end date has passed.
///
/// ```sql
/// CREATE TABLE discounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     discount_percentage NUMERIC(5, 2) NOT NULL
///         CHECK (discount_percentage > 0 AND discount_percentage <= 100),
///     start_date TIMESTAMPTZ NOT NULL,
///     end_date TIMESTAMPTZ NOT NULL,
///     on_sale BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     CHECK (start_date < end_date)
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pricing::discounted_price;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Discount {
    pub id: Uuid,
    pub book_id: Uuid,
    pub created_by: Uuid,
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub on_sale: bool,
    pub is_active: bool,
}

/// Fields supplied when creating or replacing a discount
#[derive(Debug, Clone)]
pub struct DiscountInput {
    pub book_id: Uuid,
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub on_sale: bool,
    pub is_active: bool,
}

/// A discounted book as shown in the sale listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleBook {
    pub book_id: Uuid,
    pub title: String,
    pub author_name: String,
    pub format: String,
    pub cover_image_url: Option<String>,
    pub quantity_in_stock: i32,
    pub price: Decimal,
    #[sqlx(default)]
    pub discounted_price: Decimal,
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip)]
    pub is_active: bool,
    #[serde(skip)]
    pub on_sale: bool,
}

impl SaleBook {
    fn priced(mut self) -> Self {
        self.discounted_price = discounted_price(self.price, self.discount_percentage);
        self
    }

    /// Active, on sale and inside its date window at `now`
    fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.on_sale && self.start_date <= now && now <= self.end_date
    }
}

const DISCOUNT_COLUMNS: &str =
    "id, book_id, created_by, discount_percentage, start_date, end_date, on_sale, is_active";

const SALE_SELECT: &str = "SELECT b.id AS book_id, b.title, b.author_name, b.format, \
    b.cover_image_url, i.quantity_in_stock, b.price, d.discount_percentage, \
    d.start_date, d.end_date, d.is_active, d.on_sale \
    FROM discounts d \
    JOIN books b ON b.id = d.book_id \
    JOIN inventory i ON i.book_id = b.id";

impl Discount {
    pub async fn create(pool: &PgPool, created_by: Uuid, data: DiscountInput) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Discount>(&format!(
            "INSERT INTO discounts (book_id, created_by, discount_percentage, start_date,
                                    end_date, on_sale, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {DISCOUNT_COLUMNS}"
        ))
        .bind(data.book_id)
        .bind(created_by)
        .bind(data.discount_percentage)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.on_sale)
        .bind(data.is_active)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Discount>(&format!("SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All discounts, latest start first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discounts ORDER BY start_date DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Replaces every editable field of a discount.
    pub async fn replace(pool: &PgPool, id: Uuid, data: DiscountInput) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Discount>(&format!(
            "UPDATE discounts
             SET book_id = $2, discount_percentage = $3, start_date = $4,
                 end_date = $5, on_sale = $6, is_active = $7
             WHERE id = $1
             RETURNING {DISCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(data.book_id)
        .bind(data.discount_percentage)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.on_sale)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM discounts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Books currently on sale with their discounted prices
    pub async fn current_sales(pool: &PgPool) -> Result<Vec<SaleBook>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SaleBook>(&format!(
            "{SALE_SELECT}
             WHERE d.is_active AND d.on_sale AND d.start_date <= NOW() AND d.end_date >= NOW()
             ORDER BY d.end_date, b.title"
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(SaleBook::priced).collect())
    }

    /// Sale price of one book, judged by its most recently started discount.
    ///
    /// Returns `None` when that discount is not currently on sale, even if an
    /// older one would be.
    pub async fn current_sale_for_book(pool: &PgPool, book_id: Uuid) -> Result<Option<SaleBook>, sqlx::Error> {
        let latest = sqlx::query_as::<_, SaleBook>(&format!(
            "{SALE_SELECT}
             WHERE d.book_id = $1
             ORDER BY d.start_date DESC
             LIMIT 1"
        ))
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

        let now = Utc::now();
        Ok(latest.filter(|sale| sale.is_current(now)).map(SaleBook::priced))
    }

    /// Turns off discounts whose end date has passed. Returns the number changed.
    pub async fn deactivate_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE discounts SET is_active = FALSE, on_sale = FALSE
             WHERE is_active AND end_date <= NOW()",
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

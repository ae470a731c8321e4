/// Shopping carts
///
/// A user has at most one open cart (`is_payment_done = false`), enforced by
/// a partial unique index. Placing an order empties the cart but leaves it
/// open; completing pickup marks it paid, after which the next add starts a
/// fresh cart.
///
/// ```sql
/// CREATE TABLE shopping_carts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     is_payment_done BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX shopping_carts_one_open_per_user
///     ON shopping_carts (user_id) WHERE is_payment_done = FALSE;
///
/// CREATE TABLE cart_items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     cart_id UUID NOT NULL REFERENCES shopping_carts(id) ON DELETE CASCADE,
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     quantity INTEGER NOT NULL CHECK (quantity >= 1),
///     added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (cart_id, book_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Most copies of one book a cart line may hold
pub const MAX_LINE_QUANTITY: i32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShoppingCart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_payment_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub book_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// Cart line joined with the book it holds
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartLine {
    pub cart_item_id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub author_name: String,
    pub cover_image_url: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Open cart with its lines and running totals
#[derive(Debug, Clone, Serialize)]
pub struct CartContents {
    #[serde(flatten)]
    pub cart: ShoppingCart,
    pub items: Vec<CartLine>,
    pub total_items: i64,
    pub total_price: Decimal,
}

impl CartContents {
    pub fn new(cart: ShoppingCart, items: Vec<CartLine>) -> Self {
        let total_items = items.iter().map(|line| i64::from(line.quantity)).sum();
        let total_price = items.iter().map(CartLine::subtotal).sum();

        Self {
            cart,
            items,
            total_items,
            total_price,
        }
    }
}

const CART_COLUMNS: &str = "id, user_id, is_payment_done, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, cart_id, book_id, quantity, added_at";

impl ShoppingCart {
    pub async fn find_open(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ShoppingCart>(&format!(
            "SELECT {CART_COLUMNS} FROM shopping_carts
             WHERE user_id = $1 AND is_payment_done = FALSE"
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    /// Locks and returns the user's open cart, if any.
    pub async fn lock_open(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ShoppingCart>(&format!(
            "SELECT {CART_COLUMNS} FROM shopping_carts
             WHERE user_id = $1 AND is_payment_done = FALSE
             FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    async fn open_or_create(conn: &mut PgConnection, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "INSERT INTO shopping_carts (user_id) VALUES ($1)
             ON CONFLICT (user_id) WHERE is_payment_done = FALSE DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Self::lock_open(conn, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn lines(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<CartLine>, sqlx::Error> {
        sqlx::query_as::<_, CartLine>(
            "SELECT ci.id AS cart_item_id, ci.book_id, b.title, b.author_name, b.cover_image_url,
                    b.price, ci.quantity, ci.added_at
             FROM cart_items ci
             JOIN books b ON b.id = ci.book_id
             WHERE ci.cart_id = $1
             ORDER BY ci.added_at, ci.id",
        )
        .bind(cart_id)
        .fetch_all(conn)
        .await
    }

    /// The user's open cart with its lines, or `None` when there is no open cart.
    pub async fn contents(pool: &PgPool, user_id: Uuid) -> Result<Option<CartContents>, sqlx::Error> {
        let mut conn = pool.acquire().await?;

        let Some(cart) = Self::find_open(&mut *conn, user_id).await? else {
            return Ok(None);
        };
        let items = Self::lines(&mut *conn, cart.id).await?;

        Ok(Some(CartContents::new(cart, items)))
    }

    /// Adds copies of a book to the user's open cart, creating the cart when
    /// needed. Adding a book already in the cart increases its quantity, up
    /// to [`MAX_LINE_QUANTITY`].
    pub async fn add_item(
        pool: &PgPool,
        user_id: Uuid,
        book_id: Uuid,
        quantity: i32,
    ) -> Result<CartItem, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let cart = Self::open_or_create(&mut *tx, user_id).await?;

        let item = sqlx::query_as::<_, CartItem>(&format!(
            "INSERT INTO cart_items (cart_id, book_id, quantity) VALUES ($1, $2, $3)
             ON CONFLICT (cart_id, book_id)
             DO UPDATE SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $4)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(cart.id)
        .bind(book_id)
        .bind(quantity)
        .bind(MAX_LINE_QUANTITY)
        .fetch_one(&mut *tx)
        .await?;

        Self::touch(&mut *tx, cart.id).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Sets the quantity of a line in the user's open cart.
    ///
    /// Returns `None` when the line does not exist or belongs to someone else.
    pub async fn update_item_quantity(
        pool: &PgPool,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let item = sqlx::query_as::<_, CartItem>(
            "UPDATE cart_items ci SET quantity = $3
             FROM shopping_carts c
             WHERE ci.id = $2 AND ci.cart_id = c.id
               AND c.user_id = $1 AND c.is_payment_done = FALSE
             RETURNING ci.id, ci.cart_id, ci.book_id, ci.quantity, ci.added_at",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(ref item) = item {
            Self::touch(&mut *tx, item.cart_id).await?;
        }
        tx.commit().await?;
        Ok(item)
    }

    /// Removes a line from the user's open cart.
    pub async fn remove_item(pool: &PgPool, user_id: Uuid, item_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM cart_items ci
             USING shopping_carts c
             WHERE ci.id = $2 AND ci.cart_id = c.id
               AND c.user_id = $1 AND c.is_payment_done = FALSE",
        )
        .bind(user_id)
        .bind(item_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the user's open cart together with its lines.
    pub async fn cancel(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM shopping_carts WHERE user_id = $1 AND is_payment_done = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_items(conn: &mut PgConnection, cart_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;

        Self::touch(conn, cart_id).await?;
        Ok(result.rows_affected())
    }

    /// Closes the user's open cart after pickup.
    pub async fn mark_paid(conn: &mut PgConnection, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE shopping_carts SET is_payment_done = TRUE, updated_at = NOW()
             WHERE user_id = $1 AND is_payment_done = FALSE",
        )
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE shopping_carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

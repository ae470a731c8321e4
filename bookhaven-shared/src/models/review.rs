/// Book reviews
///
/// Only customers who bought a book may review it, so every stored review is
/// a verified purchase. Authors can edit or delete their own reviews.
///
/// ```sql
/// CREATE TABLE reviews (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
///     comment TEXT NOT NULL,
///     review_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     is_verified_purchase BOOLEAN NOT NULL DEFAULT FALSE
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    /// 1 to 5
    pub rating: i16,
    pub comment: String,
    pub review_date: DateTime<Utc>,
    pub is_verified_purchase: bool,
}

#[derive(Debug, Clone)]
pub struct CreateReview {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub is_verified_purchase: bool,
}

const REVIEW_COLUMNS: &str = "id, user_id, book_id, rating, comment, review_date, is_verified_purchase";

impl Review {
    pub async fn create(pool: &PgPool, data: CreateReview) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (user_id, book_id, rating, comment, is_verified_purchase)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(data.book_id)
        .bind(data.rating)
        .bind(data.comment)
        .bind(data.is_verified_purchase)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY review_date DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_book(pool: &PgPool, book_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = $1 ORDER BY review_date DESC"
        ))
        .bind(book_id)
        .fetch_all(pool)
        .await
    }

    /// Rewrites rating and comment of the author's own review and refreshes
    /// its date. Returns `None` when the review is missing or not theirs.
    pub async fn update_own(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        rating: i16,
        comment: String,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET rating = $3, comment = $4, review_date = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_own(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Saved books ("read later")
///
/// ```sql
/// CREATE TABLE bookmarks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::book::{Book, BookDetail};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Bookmark with the full book and its stock
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkWithBook {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub book: BookDetail,
}

impl Bookmark {
    pub async fn create(pool: &PgPool, user_id: Uuid, book_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "INSERT INTO bookmarks (user_id, book_id) VALUES ($1, $2)
             RETURNING id, user_id, book_id, created_at",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(pool)
        .await
    }

    /// The bookmark, if it exists and belongs to `user_id`
    pub async fn find_own(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "SELECT id, user_id, book_id, created_at FROM bookmarks WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "SELECT id, user_id, book_id, created_at FROM bookmarks
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Attaches each bookmark's book; bookmarks whose book vanished are skipped.
    pub async fn with_books(pool: &PgPool, bookmarks: Vec<Self>) -> Result<Vec<BookmarkWithBook>, sqlx::Error> {
        let mut result = Vec::with_capacity(bookmarks.len());
        for bookmark in bookmarks {
            if let Some(book) = Book::find_detail(pool, bookmark.book_id).await? {
                result.push(BookmarkWithBook { bookmark, book });
            }
        }
        Ok(result)
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Points the caller's bookmark at another book and resets its timestamp.
    pub async fn repoint_own(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            "UPDATE bookmarks SET book_id = $3, created_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, book_id, created_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_own(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

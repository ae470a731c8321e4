/// Store announcements shown on the home page
///
/// ```sql
/// CREATE TABLE announcements (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     content TEXT NOT NULL,
///     start_date TIMESTAMPTZ NOT NULL,
///     end_date TIMESTAMPTZ NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     CHECK (start_date < end_date)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct AnnouncementInput {
    pub title: String,
    pub content: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

const ANNOUNCEMENT_COLUMNS: &str = "id, title, content, start_date, end_date, is_active, created_by";

impl Announcement {
    /// Publishes an announcement. New announcements are always active.
    pub async fn create(pool: &PgPool, created_by: Uuid, data: AnnouncementInput) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "INSERT INTO announcements (title, content, start_date, end_date, is_active, created_by)
             VALUES ($1, $2, $3, $4, TRUE, $5)
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(data.title)
        .bind(data.content)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All announcements, latest start first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY start_date DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Active announcements whose window contains the current time
    pub async fn list_current(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
             WHERE is_active AND start_date <= NOW() AND end_date > NOW()
             ORDER BY start_date DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Rewrites an announcement and re-activates it.
    pub async fn replace(pool: &PgPool, id: Uuid, data: AnnouncementInput) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "UPDATE announcements
             SET title = $2, content = $3, start_date = $4, end_date = $5, is_active = TRUE
             WHERE id = $1
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.content)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deactivates announcements whose end date has passed. Returns the number changed.
    pub async fn deactivate_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE announcements SET is_active = FALSE WHERE is_active AND end_date <= NOW()",
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

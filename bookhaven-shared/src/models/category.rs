/// Book categories and the book/category link table
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE,
///     description TEXT NOT NULL DEFAULT ''
/// );
///
/// CREATE TABLE book_categories (
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
///     PRIMARY KEY (book_id, category_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::book::{Book, BOOK_COLUMNS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Result of [`Category::assign_to_book`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Number of links that did not exist before
    Assigned(u64),
    BookNotFound,
    /// Category ids that do not exist; nothing was written
    UnknownCategories(Vec<Uuid>),
}

impl Category {
    pub async fn create(pool: &PgPool, data: CreateCategory) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2)
             RETURNING id, name, description",
        )
        .bind(data.name)
        .bind(data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All categories by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories ORDER BY name")
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories
             SET name = COALESCE($2, name), description = COALESCE($3, description)
             WHERE id = $1
             RETURNING id, name, description",
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Links a book to every category in `category_ids`.
    ///
    /// All ids must exist or nothing is written. Existing links and repeated
    /// ids are ignored.
    pub async fn assign_to_book(
        pool: &PgPool,
        book_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<Assignment, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let book_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;
        if !book_exists {
            return Ok(Assignment::BookNotFound);
        }

        let mut unique_ids = category_ids.to_vec();
        unique_ids.sort_unstable();
        unique_ids.dedup();

        let known: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
            .bind(&unique_ids)
            .fetch_all(&mut *tx)
            .await?;

        let unknown: Vec<Uuid> = unique_ids
            .iter()
            .filter(|id| !known.contains(id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            return Ok(Assignment::UnknownCategories(unknown));
        }

        let result = sqlx::query(
            "INSERT INTO book_categories (book_id, category_id)
             SELECT $1, UNNEST($2::uuid[])
             ON CONFLICT DO NOTHING",
        )
        .bind(book_id)
        .bind(&unique_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Assignment::Assigned(result.rows_affected()))
    }

    /// Books linked to a category
    pub async fn books(pool: &PgPool, category_id: Uuid) -> Result<Vec<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS}
             FROM books b
             JOIN book_categories bc ON bc.book_id = b.id
             WHERE bc.category_id = $1
             ORDER BY b.title"
        ))
        .bind(category_id)
        .fetch_all(pool)
        .await
    }

    /// Categories a book belongs to
    pub async fn for_book(pool: &PgPool, book_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT c.id, c.name, c.description
             FROM categories c
             JOIN book_categories bc ON bc.category_id = c.id
             WHERE bc.book_id = $1
             ORDER BY c.name",
        )
        .bind(book_id)
        .fetch_all(pool)
        .await
    }
}

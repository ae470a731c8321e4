/// Book catalog
///
/// Every book owns exactly one inventory row, created in the same transaction
/// as the book. Reads return [`BookDetail`], the book joined with its stock.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE books (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     isbn VARCHAR(20) NOT NULL UNIQUE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     author_name VARCHAR(255) NOT NULL,
///     publisher_name VARCHAR(255) NOT NULL DEFAULT '',
///     price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
///     format VARCHAR(50) NOT NULL DEFAULT '',
///     language VARCHAR(50) NOT NULL DEFAULT '',
///     publication_date TIMESTAMPTZ NOT NULL,
///     page_count INTEGER NOT NULL DEFAULT 0,
///     is_bestseller BOOLEAN NOT NULL DEFAULT FALSE,
///     is_award_winner BOOLEAN NOT NULL DEFAULT FALSE,
///     is_new_release BOOLEAN NOT NULL DEFAULT FALSE,
///     new_arrival BOOLEAN NOT NULL DEFAULT FALSE,
///     coming_soon BOOLEAN NOT NULL DEFAULT FALSE,
///     cover_image_url VARCHAR(512),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bookhaven_shared::models::book::{Book, BookSearch};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let page = Book::search(&pool, &BookSearch {
///     start: 0,
///     length: 10,
///     search: Some("tolkien".to_string()),
/// })
/// .await?;
/// println!("{} of {} books match", page.records_filtered, page.records_total);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::inventory::Inventory;
use crate::validation::{non_negative, not_blank};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub publisher_name: String,
    pub price: Decimal,
    pub format: String,
    pub language: String,
    pub publication_date: DateTime<Utc>,
    pub page_count: i32,
    pub is_bestseller: bool,
    pub is_award_winner: bool,
    pub is_new_release: bool,
    pub new_arrival: bool,
    pub coming_soon: bool,
    pub cover_image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book joined with its inventory row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub quantity_in_stock: i32,
    pub reorder_threshold: i32,
    pub is_available: bool,
    pub last_stocked_at: DateTime<Utc>,
}

/// Author and title, enough to label an order or cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookSummary {
    pub book_id: Uuid,
    pub title: String,
    pub author_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBook {
    #[validate(custom(function = "not_blank", message = "ISBN is required"))]
    pub isbn: String,
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "not_blank", message = "Author is required"))]
    pub author_name: String,
    #[serde(default)]
    pub publisher_name: String,
    #[validate(custom(function = "non_negative", message = "Price cannot be negative"))]
    pub price: Decimal,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub language: String,
    pub publication_date: DateTime<Utc>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Page count cannot be negative"))]
    pub page_count: i32,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub is_award_winner: bool,
    #[serde(default)]
    pub is_new_release: bool,
    #[serde(default)]
    pub new_arrival: bool,
    #[serde(default)]
    pub coming_soon: bool,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub quantity_in_stock: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Reorder threshold cannot be negative"))]
    pub reorder_threshold: i32,
}

/// Partial update; `None` leaves a column unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBook {
    #[validate(custom(function = "not_blank", message = "ISBN cannot be empty"))]
    pub isbn: Option<String>,
    #[validate(custom(function = "not_blank", message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "not_blank", message = "Author cannot be empty"))]
    pub author_name: Option<String>,
    pub publisher_name: Option<String>,
    #[validate(custom(function = "non_negative", message = "Price cannot be negative"))]
    pub price: Option<Decimal>,
    pub format: Option<String>,
    pub language: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0, message = "Page count cannot be negative"))]
    pub page_count: Option<i32>,
    pub is_bestseller: Option<bool>,
    pub is_award_winner: Option<bool>,
    pub is_new_release: Option<bool>,
    pub new_arrival: Option<bool>,
    pub coming_soon: Option<bool>,
    pub cover_image_url: Option<String>,
    pub is_active: Option<bool>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub quantity_in_stock: Option<i32>,
    #[validate(range(min = 0, message = "Reorder threshold cannot be negative"))]
    pub reorder_threshold: Option<i32>,
}

impl UpdateBook {
    fn touches_book(&self) -> bool {
        self.isbn.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.author_name.is_some()
            || self.publisher_name.is_some()
            || self.price.is_some()
            || self.format.is_some()
            || self.language.is_some()
            || self.publication_date.is_some()
            || self.page_count.is_some()
            || self.is_bestseller.is_some()
            || self.is_award_winner.is_some()
            || self.is_new_release.is_some()
            || self.new_arrival.is_some()
            || self.coming_soon.is_some()
            || self.cover_image_url.is_some()
            || self.is_active.is_some()
    }
}

/// Paging and free-text filter for the catalog listing
#[derive(Debug, Clone, Default)]
pub struct BookSearch {
    pub start: i64,
    pub length: i64,
    /// Matched case-insensitively against title, author, publisher, ISBN and language
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub records_total: i64,
    pub records_filtered: i64,
    pub data: Vec<BookDetail>,
}

pub(crate) const BOOK_COLUMNS: &str = "b.id, b.isbn, b.title, b.description, b.author_name, \
    b.publisher_name, b.price, b.format, b.language, b.publication_date, b.page_count, \
    b.is_bestseller, b.is_award_winner, b.is_new_release, b.new_arrival, b.coming_soon, \
    b.cover_image_url, b.is_active, b.created_at, b.updated_at";

const DETAIL_SELECT: &str = "SELECT b.id, b.isbn, b.title, b.description, b.author_name, \
    b.publisher_name, b.price, b.format, b.language, b.publication_date, b.page_count, \
    b.is_bestseller, b.is_award_winner, b.is_new_release, b.new_arrival, b.coming_soon, \
    b.cover_image_url, b.is_active, b.created_at, b.updated_at, \
    i.quantity_in_stock, i.reorder_threshold, i.is_available, i.last_stocked_at \
    FROM books b JOIN inventory i ON i.book_id = b.id";

fn push_search_filter(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };

    let pattern = format!("%{}%", escape_like(term));
    builder.push(" WHERE (");
    for (i, column) in ["b.title", "b.author_name", "b.publisher_name", "b.isbn", "b.language"]
        .iter()
        .enumerate()
    {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    builder.push(")");
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Book {
    /// Inserts a book and its inventory row.
    ///
    /// `is_available` is derived from the initial stock.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the ISBN is taken.
    pub async fn create(pool: &PgPool, data: CreateBook) -> Result<BookDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let book_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO books (isbn, title, description, author_name, publisher_name, price,
                               format, language, publication_date, page_count, is_bestseller,
                               is_award_winner, is_new_release, new_arrival, coming_soon,
                               cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(data.isbn)
        .bind(data.title)
        .bind(data.description)
        .bind(data.author_name)
        .bind(data.publisher_name)
        .bind(data.price)
        .bind(data.format)
        .bind(data.language)
        .bind(data.publication_date)
        .bind(data.page_count)
        .bind(data.is_bestseller)
        .bind(data.is_award_winner)
        .bind(data.is_new_release)
        .bind(data.new_arrival)
        .bind(data.coming_soon)
        .bind(data.cover_image_url)
        .fetch_one(&mut *tx)
        .await?;

        Inventory::create(&mut *tx, book_id, data.quantity_in_stock, data.reorder_threshold).await?;

        let detail = sqlx::query_as::<_, BookDetail>(&format!("{DETAIL_SELECT} WHERE b.id = $1"))
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(detail)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<BookDetail>, sqlx::Error> {
        sqlx::query_as::<_, BookDetail>(&format!("{DETAIL_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// One page of the catalog, newest first, with unfiltered and filtered counts.
    pub async fn search(pool: &PgPool, query: &BookSearch) -> Result<BookPage, sqlx::Error> {
        let records_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM books b JOIN inventory i ON i.book_id = b.id",
        );
        push_search_filter(&mut count, query.search.as_deref());
        let records_filtered: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
        push_search_filter(&mut select, query.search.as_deref());
        select
            .push(" ORDER BY b.created_at DESC, b.id LIMIT ")
            .push_bind(query.length)
            .push(" OFFSET ")
            .push_bind(query.start);
        let data = select.build_query_as::<BookDetail>().fetch_all(pool).await?;

        Ok(BookPage {
            records_total,
            records_filtered,
            data,
        })
    }

    /// Applies a partial update to the book and its inventory.
    ///
    /// Returns `None` when the book does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateBook,
    ) -> Result<Option<BookDetail>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        if data.touches_book() {
            let mut builder = QueryBuilder::<Postgres>::new("UPDATE books SET updated_at = NOW()");
            macro_rules! set {
                ($field:ident) => {
                    if let Some(value) = data.$field.clone() {
                        builder.push(concat!(", ", stringify!($field), " = ")).push_bind(value);
                    }
                };
            }
            set!(isbn);
            set!(title);
            set!(description);
            set!(author_name);
            set!(publisher_name);
            set!(price);
            set!(format);
            set!(language);
            set!(publication_date);
            set!(page_count);
            set!(is_bestseller);
            set!(is_award_winner);
            set!(is_new_release);
            set!(new_arrival);
            set!(coming_soon);
            set!(cover_image_url);
            set!(is_active);
            builder.push(" WHERE id = ").push_bind(id);
            builder.build().execute(&mut *tx).await?;
        }

        if data.quantity_in_stock.is_some() || data.reorder_threshold.is_some() {
            Inventory::restock(&mut *tx, id, data.quantity_in_stock, data.reorder_threshold).await?;
        }

        let detail = sqlx::query_as::<_, BookDetail>(&format!("{DETAIL_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(detail))
    }

    /// Deletes a book; inventory, category links, cart lines, reviews,
    /// bookmarks and discounts cascade.
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the book appears on an order.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("tolkien"), "tolkien");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }

    #[test]
    fn test_search_filter_binds_every_column() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM books b");
        push_search_filter(&mut builder, Some("  dune "));
        let sql = builder.sql();
        assert_eq!(sql.matches("ILIKE").count(), 5);
        assert!(sql.contains("b.isbn ILIKE $4"));
    }

    #[test]
    fn test_blank_search_adds_no_filter() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM books b");
        push_search_filter(&mut builder, Some("   "));
        assert_eq!(builder.sql(), "SELECT 1 FROM books b");
    }

    #[test]
    fn test_update_book_detects_inventory_only_changes() {
        let update = UpdateBook {
            quantity_in_stock: Some(3),
            ..Default::default()
        };
        assert!(!update.touches_book());

        let update = UpdateBook {
            title: Some("Dune".to_string()),
            ..Default::default()
        };
        assert!(update.touches_book());
    }
}

/// User accounts
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'member', 'staff');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     address VARCHAR(255) NOT NULL,
///     phone_number VARCHAR(10) NOT NULL UNIQUE,
///     role user_role NOT NULL DEFAULT 'member',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bookhaven_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "reader@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Reader".to_string(),
///     address: "12 Library Lane".to_string(),
///     phone_number: "9800000000".to_string(),
///     role: UserRole::Member,
/// })
/// .await?;
///
/// let found = User::find_by_email(&pool, "READER@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Store roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Manages catalog, discounts, announcements and users
    Admin,

    /// Customer
    Member,

    /// Processes claim codes at the counter
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Member => "member",
            UserRole::Staff => "staff",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Case-insensitive (CITEXT)
    pub email: String,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub address: String,

    /// Exactly ten digits, unique
    pub phone_number: String,

    pub role: UserRole,

    /// Inactive users cannot log in
    pub is_active: bool,

    pub date_joined: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    /// Already hashed
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub phone_number: String,
    pub role: UserRole,
}

/// Result of [`User::promote_to_staff`]
#[derive(Debug, Clone)]
pub enum Promotion {
    Promoted(User),
    NotFound,
    /// Only members can be promoted
    NotMember(UserRole),
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, address, \
                            phone_number, role, is_active, date_joined, last_login_at";

impl User {
    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the email or phone number is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, address, phone_number, role)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.address)
            .bind(data.phone_number)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive lookup
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await
    }

    pub async fn phone_exists(pool: &PgPool, phone_number: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE phone_number = $1)")
            .bind(phone_number)
            .fetch_one(pool)
            .await
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All users, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Deletes a user and, by cascade, their carts, orders, reviews and bookmarks.
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the user processed orders or
    /// authored discounts or announcements.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Changes a member into staff.
    ///
    /// The row is locked for the duration of the check so two concurrent
    /// promotions cannot both observe the member role.
    pub async fn promote_to_staff(pool: &PgPool, id: Uuid) -> Result<Promotion, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current: Option<UserRole> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = match current {
            None => Promotion::NotFound,
            Some(UserRole::Member) => {
                let user = sqlx::query_as::<_, User>(&format!(
                    "UPDATE users SET role = 'staff' WHERE id = $1 RETURNING {USER_COLUMNS}"
                ))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                Promotion::Promoted(user)
            }
            Some(role) => Promotion::NotMember(role),
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

/// True when `phone` is exactly ten ASCII digits.
pub fn is_valid_phone_number(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_strings() {
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::Staff.to_string(), "staff");
        assert_eq!(serde_json::to_string(&UserRole::Member).unwrap(), "\"member\"");
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "reader@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Reader".to_string(),
            address: "12 Library Lane".to_string(),
            phone_number: "9800000000".to_string(),
            role: UserRole::Member,
            is_active: true,
            date_joined: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "member");
        assert_eq!(user.full_name(), "Ada Reader");
    }

    #[test]
    fn test_phone_number_validation() {
        assert!(is_valid_phone_number("9800000000"));
        assert!(!is_valid_phone_number("980000000"));
        assert!(!is_valid_phone_number("98000000001"));
        assert!(!is_valid_phone_number("98000-0000"));
        assert!(!is_valid_phone_number("٩٨٠٠٠٠٠٠٠٠"));
    }
}

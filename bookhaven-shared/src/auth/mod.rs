/// Authentication and authorization
///
/// - [`password`]: Argon2id hashing and strength rules
/// - [`jwt`]: HS256 access and refresh tokens carrying the user's role
/// - [`middleware`]: axum middleware that turns a bearer token into an [`middleware::AuthContext`]
/// - [`authorization`]: role and ownership checks used by route handlers
///
/// # Example
///
/// ```
/// use bookhaven_shared::auth::authorization::require_role;
/// use bookhaven_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use bookhaven_shared::auth::middleware::AuthContext;
/// use bookhaven_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let token = create_token(&Claims::new(Uuid::new_v4(), UserRole::Staff, TokenType::Access), secret)?;
///
/// let auth = AuthContext::from_claims(&validate_access_token(&token, secret)?);
/// require_role(&auth, &[UserRole::Admin, UserRole::Staff])?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;

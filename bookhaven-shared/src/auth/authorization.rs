/// Role and ownership checks
///
/// Roles come from the access token, so these checks are synchronous. Route
/// handlers call them before touching the database.

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Requires role {required}, caller is {actual}")]
    InsufficientRole { required: String, actual: UserRole },

    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Succeeds when the caller holds one of `allowed`.
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        return Ok(());
    }

    Err(AuthzError::InsufficientRole {
        required: allowed
            .iter()
            .map(UserRole::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        actual: auth.role,
    })
}

pub fn require_member(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, &[UserRole::Member])
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, &[UserRole::Admin])
}

/// Admin or staff
pub fn require_store_staff(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, &[UserRole::Admin, UserRole::Staff])
}

/// Succeeds when the caller owns the resource.
pub fn require_ownership(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != owner_id {
        return Err(AuthzError::NotAuthorized);
    }
    Ok(())
}

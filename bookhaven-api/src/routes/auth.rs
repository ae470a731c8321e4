/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create a member account
/// - `POST /v1/auth/login` - Exchange credentials for tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    services::email::{dispatch, welcome_email},
};
use axum::{extract::State, http::StatusCode, Json};
use bookhaven_shared::{
    auth::{
        jwt::{self, TokenPair, TokenType},
        password,
    },
    models::user::{is_valid_phone_number, CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Also checked for character classes
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,

    #[validate(length(min = 1, max = 255, message = "Address must be 1 to 255 characters"))]
    pub address: String,

    /// Exactly ten digits
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    /// Current role, which may differ from the one in the refresh token
    pub role: UserRole,
}

/// Register a new account
///
/// The account whose email matches `ADMIN_EMAIL` becomes admin; everyone
/// else starts as a member. A welcome email is sent in the background.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: invalid email, weak password or bad phone number
/// - `409 Conflict`: email or phone number already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    if !is_valid_phone_number(&req.phone_number) {
        return Err(ApiError::invalid_field(
            "phone_number",
            "Phone number must be exactly 10 digits",
        ));
    }

    let email = req.email.trim().to_string();

    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }
    if User::phone_exists(&state.db, &req.phone_number).await? {
        return Err(ApiError::Conflict("Phone number already registered".to_string()));
    }

    let role = if state.config.store.is_admin_email(&email) {
        UserRole::Admin
    } else {
        UserRole::Member
    };

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email,
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            address: req.address.trim().to_string(),
            phone_number: req.phone_number,
            role,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    match welcome_email(&user) {
        Ok(email) => dispatch(state.mailer.clone(), email),
        Err(e) => tracing::warn!(error = %e, user_id = %user.id, "Failed to render welcome email"),
    }

    let tokens = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            email: user.email,
            role: user.role,
            tokens,
        }),
    ))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email, wrong password or deactivated account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        tracing::debug!(user_id = %user.id, "Login rejected: account inactive");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        full_name: user.full_name(),
        email: user.email,
        role: user.role,
        tokens,
    }))
}

/// Token refresh endpoint
///
/// The user is re-read so a promotion or deactivation takes effect here.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired or access token supplied, or the
///   account no longer exists or is inactive
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account is not active".to_string()))?;

    let access = jwt::Claims::new(user.id, user.role, TokenType::Access);
    let access_token = jwt::create_token(&access, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer",
        expires_in: access.expires_in_seconds(),
        role: user.role,
    }))
}

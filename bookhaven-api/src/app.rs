/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use bookhaven_api::{app::AppState, config::Config};
/// use bookhaven_api::services::email::LogMailer;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = sqlx::PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(LogMailer));
/// let app = bookhaven_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::security::SecurityHeadersLayer,
    services::{email::Mailer, notifier::OrderNotifier},
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use bookhaven_shared::auth::middleware::jwt_auth_middleware;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound email
    pub mailer: Arc<dyn Mailer>,

    /// `order_placed` fan-out for the SSE endpoint
    pub notifier: OrderNotifier,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
            notifier: OrderNotifier::default(),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health                                  public
/// /v1/auth/{register,login,refresh}        public
/// /v1/books, /v1/categories, /v1/reviews   reads public, writes authenticated
/// /v1/announcements, /v1/discounts/sale    reads public
/// /v1/users, /v1/cart, /v1/orders,
/// /v1/bookmarks, /v1/discounts             authenticated
/// ```
///
/// Authenticated groups carry the JWT layer as a route layer, so unknown
/// paths still answer 404. Role checks happen in the handlers.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/books", get(routes::books::list_books))
        .route("/books/:id", get(routes::books::get_book))
        .route("/books/:id/categories", get(routes::categories::list_book_categories))
        .route("/books/:id/reviews", get(routes::reviews::list_book_reviews))
        .route("/books/:id/sale", get(routes::discounts::get_book_sale))
        .route("/categories", get(routes::categories::list_categories))
        .route("/categories/:id", get(routes::categories::get_category))
        .route("/categories/:id/books", get(routes::categories::list_category_books))
        .route("/reviews", get(routes::reviews::list_reviews))
        .route("/reviews/:id", get(routes::reviews::get_review))
        .route("/discounts/sale", get(routes::discounts::list_sale_books))
        .route("/announcements", get(routes::announcements::list_announcements))
        .route("/announcements/active", get(routes::announcements::list_active_announcements))
        .route("/announcements/:id", get(routes::announcements::get_announcement));

    let protected_routes = Router::new()
        // Users (admin)
        .route("/users", get(routes::users::list_users))
        .route("/users/me", get(routes::users::current_user))
        .route(
            "/users/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        )
        .route("/users/:id/promote", post(routes::users::promote_user))
        // Catalog writes (admin)
        .route("/books", post(routes::books::create_book))
        .route("/books/low-stock", get(routes::books::list_low_stock))
        .route(
            "/books/:id",
            put(routes::books::update_book).delete(routes::books::delete_book),
        )
        .route("/books/:id/categories", put(routes::categories::assign_categories))
        .route("/categories", post(routes::categories::create_category))
        .route(
            "/categories/:id",
            put(routes::categories::update_category).delete(routes::categories::delete_category),
        )
        // Cart
        .route(
            "/cart",
            get(routes::cart::get_cart).delete(routes::cart::cancel_cart),
        )
        .route("/cart/items", post(routes::cart::add_item))
        .route(
            "/cart/items/:id",
            put(routes::cart::update_item).delete(routes::cart::remove_item),
        )
        .route("/cart/purchases", get(routes::cart::list_purchases))
        // Orders
        .route(
            "/orders",
            post(routes::orders::place_order).get(routes::orders::list_orders),
        )
        .route("/orders/mine", get(routes::orders::list_my_orders))
        .route("/orders/history", get(routes::orders::order_history))
        .route("/orders/events", get(routes::orders::order_events))
        .route("/orders/:id", get(routes::orders::get_order))
        .route("/orders/:id/cancel", post(routes::orders::cancel_order))
        .route("/orders/claims/:code/process", post(routes::orders::process_claim))
        .route("/orders/claims/:code/complete", post(routes::orders::complete_claim))
        // Reviews
        .route("/reviews", post(routes::reviews::create_review))
        .route(
            "/reviews/:id",
            put(routes::reviews::update_review).delete(routes::reviews::delete_review),
        )
        // Bookmarks
        .route(
            "/bookmarks",
            get(routes::bookmarks::list_bookmarks).post(routes::bookmarks::create_bookmark),
        )
        .route("/bookmarks/count", get(routes::bookmarks::count_bookmarks))
        .route(
            "/bookmarks/:id",
            get(routes::bookmarks::get_bookmark)
                .put(routes::bookmarks::update_bookmark)
                .delete(routes::bookmarks::delete_bookmark),
        )
        // Discounts
        .route(
            "/discounts",
            get(routes::discounts::list_discounts).post(routes::discounts::create_discount),
        )
        .route(
            "/discounts/:id",
            get(routes::discounts::get_discount)
                .put(routes::discounts::update_discount)
                .delete(routes::discounts::delete_discount),
        )
        // Announcements (admin)
        .route("/announcements", post(routes::announcements::create_announcement))
        .route(
            "/announcements/:id",
            put(routes::announcements::update_announcement)
                .delete(routes::announcements::delete_announcement),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication layer
///
/// Validates the bearer token and injects an `AuthContext` into the request
/// extensions; handlers pick it up with the `AuthContext` extractor.
async fn jwt_auth_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match jwt_auth_middleware(state.jwt_secret().to_string(), req, next).await {
        Ok(response) => response,
        Err(rejection) => rejection.into_response(),
    }
}

/// Middleware modules for the API server
///
/// Authentication lives in `bookhaven_shared::auth::middleware`; this module
/// holds the HTTP-level layers:
/// - Security headers

pub mod security;

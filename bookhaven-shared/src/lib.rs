//! # BookHaven Shared Library
//!
//! Types and data access shared by the BookHaven API server and the expiry
//! sweeper worker.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and schema migrations
//! - `models`: database models and their repository functions
//! - `auth`: password hashing, JWT tokens and role checks
//! - `pricing`: bulk discounts, sale prices and claim codes
//! - `validation`: custom field rules for request bodies

pub mod auth;
pub mod db;
pub mod models;
pub mod pricing;
pub mod validation;

/// Current version of the BookHaven shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

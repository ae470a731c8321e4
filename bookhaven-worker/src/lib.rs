//! # BookHaven Worker Library
//!
//! Background jobs that run beside the API server.
//!
//! ## Modules
//!
//! - `config`: Worker configuration from the environment
//! - `sweeper`: Deactivates announcements and discounts past their end date

pub mod config;
pub mod sweeper;

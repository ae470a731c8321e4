/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token refresh
/// - `users`: User administration and staff promotion
/// - `books`: Catalog search and book management
/// - `categories`: Categories and book assignments
/// - `cart`: The caller's open shopping cart
/// - `orders`: Order placement, claim processing and the order event stream
/// - `reviews`: Verified-purchase reviews
/// - `bookmarks`: Saved books
/// - `discounts`: Discounts and the sale listing
/// - `announcements`: Timed store announcements

pub mod announcements;
pub mod auth;
pub mod bookmarks;
pub mod books;
pub mod cart;
pub mod categories;
pub mod discounts;
pub mod health;
pub mod orders;
pub mod reviews;
pub mod users;

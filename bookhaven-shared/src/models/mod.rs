/// Database models and their repository functions
///
/// - `user`: accounts and roles
/// - `book`, `inventory`, `category`: the catalog
/// - `cart`: open shopping carts
/// - `order`, `purchase`: checkout, pickup and purchase history
/// - `review`, `bookmark`, `discount`, `announcement`: engagement
///
/// Functions that must run inside a caller's transaction take
/// `&mut PgConnection`; everything else takes the pool.

pub mod announcement;
pub mod book;
pub mod bookmark;
pub mod cart;
pub mod category;
pub mod discount;
pub mod inventory;
pub mod order;
pub mod purchase;
pub mod review;
pub mod user;

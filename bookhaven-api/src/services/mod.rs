/// Side effects behind the route handlers
///
/// - `email`: SMTP delivery and message templates
/// - `notifier`: broadcast channel for order events
/// - `orders`: order workflows that notify and email after commit

pub mod email;
pub mod notifier;
pub mod orders;

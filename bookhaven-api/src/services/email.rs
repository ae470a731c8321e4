//! Transactional email.
//!
//! Bodies are rendered from the Askama templates under `templates/email`.
//! Handlers never wait on SMTP: messages are rendered up front and handed to
//! [`dispatch`], which sends them on a background task and logs failures.

use std::sync::{Arc, Mutex};

use askama::Template;
use async_trait::async_trait;
use bookhaven_shared::models::{
    order::{Order, OrderItemDetail},
    user::User,
};
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message with plain text and HTML bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// Delivers mail through an SMTP relay with STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns an error if the relay host cannot be resolved into a transport.
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured; writes the message to the log instead.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text_body,
            "SMTP disabled, email not delivered"
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(email);
        }
        Ok(())
    }
}

/// Sends `email` on a background task. Failures are logged and dropped.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = mailer.send(email).await {
            tracing::warn!(error = %e, to = %to, subject = %subject, "Failed to send email");
        }
    });
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a Order,
    order_date: &'a str,
    items: &'a [OrderItemDetail],
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a Order,
    order_date: &'a str,
    items: &'a [OrderItemDetail],
}

#[derive(Template)]
#[template(path = "email/order_completed.html")]
struct OrderCompletedHtml<'a> {
    order: &'a Order,
    items: &'a [OrderItemDetail],
}

#[derive(Template)]
#[template(path = "email/order_completed.txt")]
struct OrderCompletedText<'a> {
    order: &'a Order,
    items: &'a [OrderItemDetail],
}

/// # Errors
///
/// Returns an error if a template fails to render.
pub fn welcome_email(user: &User) -> Result<OutgoingEmail, EmailError> {
    let name = user.full_name();

    Ok(OutgoingEmail {
        to: user.email.clone(),
        subject: "Welcome to BookHaven".to_string(),
        text_body: WelcomeEmailText { name: &name }.render()?,
        html_body: WelcomeEmailHtml { name: &name }.render()?,
    })
}

/// Sent right after an order is placed; carries the claim code.
pub fn order_confirmation_email(
    to: &str,
    order: &Order,
    items: &[OrderItemDetail],
) -> Result<OutgoingEmail, EmailError> {
    let order_date = order.order_date.format("%d %b %Y").to_string();

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("BookHaven Order Confirmation - Order {}", order.claim_code),
        text_body: OrderConfirmationText {
            order,
            order_date: &order_date,
            items,
        }
        .render()?,
        html_body: OrderConfirmationHtml {
            order,
            order_date: &order_date,
            items,
        }
        .render()?,
    })
}

/// Sent when staff hand the order over at the counter.
pub fn order_completed_email(
    to: &str,
    order: &Order,
    items: &[OrderItemDetail],
) -> Result<OutgoingEmail, EmailError> {
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Your BookHaven order is complete".to_string(),
        text_body: OrderCompletedText { order, items }.render()?,
        html_body: OrderCompletedHtml { order, items }.render()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookhaven_shared::models::{order::OrderStatus, user::UserRole};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn sample_order() -> (Order, Vec<OrderItemDetail>) {
        let order_id = Uuid::new_v4();
        let order = Order {
            id: order_id,
            user_id: Uuid::new_v4(),
            order_date: Utc.with_ymd_and_hms(2025, 5, 6, 10, 0, 0).unwrap(),
            total_amount: Decimal::new(7000, 2),
            discount_applied: true,
            discount_amount: Decimal::new(350, 2),
            final_amount: Decimal::new(6650, 2),
            status: OrderStatus::Pending,
            claim_code: "AB12CD34".to_string(),
            updated_at: None,
            pickup_date: None,
            processed_by: None,
        };
        let items = vec![OrderItemDetail {
            id: Uuid::new_v4(),
            order_id,
            book_id: Uuid::new_v4(),
            book_title: "Rust <Atomics> & Locks".to_string(),
            author_name: "Mara Bos".to_string(),
            quantity: 5,
            price_at_order: Decimal::new(1400, 2),
            subtotal: Decimal::new(7000, 2),
        }];
        (order, items)
    }

    #[test]
    fn test_confirmation_email_contents() {
        let (order, items) = sample_order();
        let email = order_confirmation_email("reader@example.com", &order, &items).unwrap();

        assert_eq!(email.to, "reader@example.com");
        assert!(email.subject.contains("AB12CD34"));
        assert!(email.text_body.contains("Claim code: AB12CD34"));
        assert!(email.text_body.contains("Order date: 06 May 2025"));
        assert!(email.text_body.contains("Final amount: Rs 66.50"));
        assert!(email.html_body.contains("Rust &lt;Atomics&gt; &amp; Locks"));
        assert!(!email.html_body.contains("<Atomics>"));
    }

    #[test]
    fn test_completed_email_lists_books() {
        let (order, items) = sample_order();
        let email = order_completed_email("reader@example.com", &order, &items).unwrap();

        assert!(email.text_body.contains("Rust <Atomics> & Locks by Mara Bos"));
        assert!(email.html_body.contains("Rs 66.50"));
    }

    #[test]
    fn test_welcome_email_uses_full_name() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Ada".to_string(),
            last_name: "Reader".to_string(),
            address: "12 Library Lane".to_string(),
            phone_number: "9800000000".to_string(),
            role: UserRole::Member,
            is_active: true,
            date_joined: Utc::now(),
            last_login_at: None,
        };

        let email = welcome_email(&user).unwrap();
        assert_eq!(email.to, "ada@example.com");
        assert!(email.text_body.starts_with("Hi Ada Reader,"));
        assert!(email.html_body.contains("Hi Ada Reader,"));

        let user = User {
            first_name: "<b>Ada</b>".to_string(),
            ..user
        };
        let email = welcome_email(&user).unwrap();
        assert!(email.html_body.contains("&lt;b&gt;Ada&lt;/b&gt; Reader"));
        assert!(!email.html_body.contains("<b>Ada</b>"));
        assert!(email.text_body.starts_with("Hi <b>Ada</b> Reader,"));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let mailer = Arc::new(MemoryMailer::default());
        let (order, items) = sample_order();

        dispatch(
            mailer.clone(),
            order_confirmation_email("reader@example.com", &order, &items).unwrap(),
        );

        for _ in 0..50 {
            if !mailer.sent().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let (order, items) = sample_order();
        let result = LogMailer
            .send(order_completed_email("reader@example.com", &order, &items).unwrap())
            .await;
        assert!(result.is_ok());
    }
}

//! In-process fan-out of order notifications.
//!
//! Every placed order is published on a `tokio::sync::broadcast` channel;
//! the `/v1/orders/events` SSE endpoint subscribes one receiver per client.
//! A subscriber that falls more than [`CHANNEL_CAPACITY`] events behind
//! loses the oldest ones.

use bookhaven_shared::models::{book::BookSummary, order::PlacedOrder};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub const CHANNEL_CAPACITY: usize = 256;

/// Payload of the `order_placed` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub message: String,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub books: Vec<BookSummary>,
}

impl OrderPlaced {
    pub fn from_placed(placed: &PlacedOrder) -> Self {
        let mut books: Vec<BookSummary> = placed
            .items
            .iter()
            .map(|item| BookSummary {
                book_id: item.book_id,
                title: item.book_title.clone(),
                author_name: item.author_name.clone(),
            })
            .collect();
        books.dedup_by_key(|b| b.book_id);

        Self {
            message: format!("New order placed by member {}", placed.order.user_id),
            order_id: placed.order.id,
            user_id: placed.order.user_id,
            books,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderNotifier {
    sender: broadcast::Sender<OrderPlaced>,
}

impl Default for OrderNotifier {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl OrderNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes to every current subscriber and returns how many there were.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: OrderPlaced) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("No order event subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderPlaced> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{entities::order::PaymentMethod, errors::ServiceError};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the receiver is gone.
    /// Used after commit, where the order already exists.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping event after commit");
        }
    }
}

/// Facts emitted once an order placement has committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total_price: i64,
        payment_method: PaymentMethod,
    },
    CartCheckedOut {
        cart_id: Uuid,
        order_id: Uuid,
    },
    OnlinePaymentRequested {
        order_id: Uuid,
        total_price: i64,
    },
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderPlaced {
                order_id,
                user_id,
                total_price,
                payment_method,
            } => {
                info!(
                    %order_id,
                    %user_id,
                    total_price,
                    payment_method = %payment_method,
                    "Order placed"
                );
            }
            Event::CartCheckedOut { cart_id, order_id } => {
                info!(%cart_id, %order_id, "Cart cleared by checkout");
            }
            Event::OnlinePaymentRequested {
                order_id,
                total_price,
            } => {
                info!(%order_id, total_price, "Awaiting online payment");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let event = Event::CartCheckedOut {
            cart_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
        };

        sender.send(event.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::OnlinePaymentRequested {
                order_id: Uuid::new_v4(),
                total_price: 10,
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ServiceError::EventError(_)));
        assert_eq!(err.response_message(), crate::errors::SYSTEM_BUSY_MESSAGE);

        // must not panic
        sender
            .send_or_log(Event::OnlinePaymentRequested {
                order_id: Uuid::new_v4(),
                total_price: 10,
            })
            .await;
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::OrderPlaced {
                order_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                total_price: 36_030_000,
                payment_method: PaymentMethod::Cod,
            })
            .await
            .unwrap();
        drop(sender);

        process_events(rx).await;
    }
}

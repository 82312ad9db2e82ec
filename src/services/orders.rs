use crate::{
    entities::{
        order::{self, Entity as Order, OrderStatus, PaymentMethod, PaymentStatus},
        order_detail::{self, Entity as OrderDetail},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// An order with its frozen lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub details: Vec<order_detail::Model>,
}

/// Reads placed orders and records the switch to online payment
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithDetails, ServiceError> {
        let db = self.db_pool.as_ref();
        let order = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let details = OrderDetail::find()
            .filter(order_detail::Column::OrderId.eq(order_id))
            .order_by_asc(order_detail::Column::Id)
            .all(db)
            .await?;

        Ok(OrderWithDetails { order, details })
    }

    /// Marks a freshly placed order as awaiting an online payment.
    ///
    /// Only PENDING, not yet paid orders qualify.
    #[instrument(skip(self))]
    pub async fn mark_online_payment(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if existing.status != OrderStatus::Pending || existing.payment_status == PaymentStatus::Paid {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} can no longer switch to online payment",
                order_id
            )));
        }

        let mut active: order::ActiveModel = existing.into();
        active.payment_method = Set(PaymentMethod::Online);
        active.payment_status = Set(PaymentStatus::Pending);
        let updated = active.update(db).await?;

        info!(%order_id, total_price = updated.total_price, "Order switched to online payment");

        self.event_sender
            .send_or_log(Event::OnlinePaymentRequested {
                order_id,
                total_price: updated.total_price,
            })
            .await;

        Ok(updated)
    }
}

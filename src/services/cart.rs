use crate::{
    entities::{
        cart::{self, Entity as Cart, Model as CartModel},
        cart_item::{self, Entity as CartItem, Model as CartItemModel},
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A user's cart together with its purchasable lines
#[derive(Debug, Clone)]
pub struct CartLines {
    pub cart: CartModel,
    /// Lines with a positive quantity, oldest first
    pub lines: Vec<CartItemModel>,
}

/// Cart reads and the checkout-time clear.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the user's cart, or `None` if they never had one.
    #[instrument(skip(self))]
    pub async fn get_cart_lines(&self, user_id: Uuid) -> Result<Option<CartLines>, ServiceError> {
        let Some(cart) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::Quantity.gt(0))
            .order_by_asc(cart_item::Column::CreatedAt)
            .order_by_asc(cart_item::Column::Id)
            .all(self.db.as_ref())
            .await?;

        Ok(Some(CartLines { cart, lines }))
    }

    /// Deletes every line of a cart and zeroes its running total.
    ///
    /// Runs on the caller's connection so checkout can clear the cart inside
    /// its own transaction.
    pub async fn clear_cart<C>(conn: &C, cart_id: Uuid) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(conn)
            .await?;

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();

        cart.total = Set(0);
        cart.updated_at = Set(Utc::now());
        cart.update(conn).await?;

        info!("Cleared cart: {}", cart_id);
        Ok(())
    }
}

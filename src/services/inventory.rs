use crate::{
    entities::product::{self, Entity as Product, Model as ProductModel},
    errors::ServiceError,
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter,
};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Service for product stock reads and guarded decrements
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DatabaseConnection>,
}

impl InventoryService {
    /// Creates a new inventory service instance
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Fetches a product by id
    #[instrument(skip(self))]
    pub async fn find_product(&self, product_id: Uuid) -> Result<Option<ProductModel>, ServiceError> {
        Ok(Product::find_by_id(product_id)
            .one(self.db_pool.as_ref())
            .await?)
    }

    /// Takes `quantity` units off a product only if that many are on hand.
    ///
    /// The stock predicate lives in the UPDATE itself, so concurrent buyers
    /// cannot both take the last unit. Returns the affected row count; zero
    /// means the product is missing or short.
    pub async fn decrement_if_available<C>(
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Product::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(quantity),
            )
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::Quantity.gte(quantity))
            .exec(conn)
            .await?;

        debug!(
            %product_id,
            quantity,
            rows_affected = result.rows_affected,
            "Guarded stock decrement"
        );
        Ok(result.rows_affected)
    }
}

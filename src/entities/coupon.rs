use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discount code. Either a percent-off-goods coupon or, when `free_ship` is
/// set, a capped shipping waiver.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub is_active: bool,
    pub expiry_date: DateTime<Utc>,
    /// Percent off the subtotal, ignored for free-ship coupons
    pub discount: i32,
    pub min_order: i64,
    pub free_ship: bool,
    /// Largest shipping amount a free-ship coupon may waive; unset means the whole fee
    #[sea_orm(nullable)]
    pub ship_discount_cap: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

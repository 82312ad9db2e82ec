use crate::{
    entities::coupon::{self, Entity as Coupon, Model as CouponModel},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Why a coupon could not be applied to an order.
///
/// The display text is shown to the buyer as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Coupon {0} does not exist")]
    NotFound(String),
    #[error("Coupon is invalid or expired")]
    Inactive,
    #[error("Coupon is invalid or expired")]
    Expired,
    #[error("Order has not reached the free shipping threshold of {minimum}")]
    FreeShipThresholdNotMet { minimum: i64 },
    #[error("Discount coupons require an order of at least {minimum}")]
    BelowPlatformMinimum { minimum: i64 },
    #[error("This coupon requires an order of at least {minimum}")]
    BelowCouponMinimum { minimum: i64 },
}

/// Amounts a coupon takes off an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CouponOutcome {
    pub order_discount: i64,
    pub shipping_discount: i64,
}

/// Decides what a coupon is worth against a subtotal and shipping fee.
///
/// `percent_floor` is the store-wide minimum subtotal for percent coupons.
/// It is checked before the coupon's own `min_order` and does not apply to
/// free-ship coupons.
pub fn apply_coupon(
    coupon: Option<&CouponModel>,
    subtotal: i64,
    shipping_fee: i64,
    percent_floor: i64,
    now: DateTime<Utc>,
) -> Result<CouponOutcome, CouponRejection> {
    let Some(coupon) = coupon else {
        return Ok(CouponOutcome::default());
    };

    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.expiry_date <= now {
        return Err(CouponRejection::Expired);
    }

    if coupon.free_ship {
        if subtotal < coupon.min_order {
            return Err(CouponRejection::FreeShipThresholdNotMet {
                minimum: coupon.min_order,
            });
        }
        let cap = coupon.ship_discount_cap.unwrap_or(shipping_fee);
        return Ok(CouponOutcome {
            order_discount: 0,
            shipping_discount: shipping_fee.min(cap).max(0),
        });
    }

    if subtotal < percent_floor {
        return Err(CouponRejection::BelowPlatformMinimum {
            minimum: percent_floor,
        });
    }
    if subtotal < coupon.min_order {
        return Err(CouponRejection::BelowCouponMinimum {
            minimum: coupon.min_order,
        });
    }

    Ok(CouponOutcome {
        order_discount: (subtotal * i64::from(coupon.discount)).div_euclid(100),
        shipping_discount: 0,
    })
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Looks a coupon up by code. Blank codes mean "no coupon".
    #[instrument(skip(self))]
    pub async fn find_coupon(&self, code: &str) -> Result<Option<CouponModel>, ServiceError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let found = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await?;

        debug!(found = found.is_some(), "Coupon lookup finished");
        Ok(found)
    }
}

//! Unit price resolution and subtotal aggregation.

/// Unit price actually charged for a catalog price and discount percent.
///
/// Rounds half up on the exact integer product, so 9 at 50% becomes 5.
/// The discount is trusted catalog data and is not clamped.
pub fn resolve_unit_price(price: i64, discount_percent: i32) -> i64 {
    if discount_percent <= 0 {
        return price;
    }

    let scaled = price * i64::from(100 - discount_percent);
    (scaled + 50).div_euclid(100)
}

/// One priced line of a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: i64,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Pre-coupon subtotal across lines
pub fn subtotal<'a>(lines: impl IntoIterator<Item = &'a PricedLine>) -> i64 {
    lines.into_iter().map(PricedLine::line_total).sum()
}

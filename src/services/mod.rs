pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod pricing;
pub mod shipping;

pub mod cart;
pub mod cart_item;
pub mod coupon;
pub mod order;
pub mod order_detail;
pub mod product;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use coupon::Entity as Coupon;
pub use order::Entity as Order;
pub use order_detail::Entity as OrderDetail;
pub use product::Entity as Product;

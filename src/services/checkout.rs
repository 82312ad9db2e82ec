use crate::{
    config::CheckoutConfig,
    entities::{
        order::{self, OrderStatus, PaymentMethod, PaymentStatus},
        order_detail,
        product::Model as ProductModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::CartService,
        coupons::{apply_coupon, CouponOutcome, CouponRejection, CouponService},
        inventory::InventoryService,
        pricing::{self, resolve_unit_price, PricedLine},
        shipping::RegionTier,
    },
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Where the lines of an order come from, as sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSource {
    Cart,
    Buy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Inbound order placement request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Receiver name is required"))]
    pub receiver_name: String,
    #[validate(length(min = 1, message = "Receiver address is required"))]
    pub receiver_address: String,
    #[validate(length(min = 1, max = 32, message = "Receiver phone is required"))]
    pub receiver_phone: String,
    pub receiver_note: Option<String>,
    pub coupon_code: Option<String>,
    pub mode: OrderSource,
    /// Only read in buy mode, where it must hold exactly one line
    #[serde(default)]
    #[validate]
    pub items: Vec<OrderLineInput>,
    /// COD when omitted
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub receiver_province_code: Option<String>,
    pub receiver_district_code: Option<String>,
    pub receiver_ward_code: Option<String>,
    pub receiver_street: Option<String>,
}

/// Single-product purchase intent that bypasses the cart. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyNowTicket {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Cart,
    Buy(BuyNowTicket),
}

impl PlaceOrderRequest {
    /// Resolves the request's mode and buy-now line into a checkout mode.
    pub fn checkout_mode(&self) -> Result<CheckoutMode, ServiceError> {
        match self.mode {
            OrderSource::Cart => Ok(CheckoutMode::Cart),
            OrderSource::Buy => match self.items.as_slice() {
                [line] if line.quantity > 0 => Ok(CheckoutMode::Buy(BuyNowTicket {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })),
                [_] => Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                )),
                [] => Err(ServiceError::ValidationError(
                    "There is no product to buy".to_string(),
                )),
                _ => Err(ServiceError::ValidationError(
                    "Buy now accepts exactly one product".to_string(),
                )),
            },
        }
    }

    fn trimmed_coupon_code(&self) -> Option<String> {
        self.coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
    }
}

/// Committed order summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub subtotal: i64,
    pub total_price: i64,
    pub discount_amount: i64,
    pub shipping_fee: i64,
    pub shipping_discount: i64,
    pub shipping_tier: RegionTier,
    pub payment_method: PaymentMethod,
    pub cart_id: Option<Uuid>,
}

/// Structured result handed back to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_fee: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_discount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlaceOrderResponse {
    pub fn failure(err: &ServiceError) -> Self {
        Self {
            success: false,
            order_id: None,
            total_price: None,
            discount_amount: None,
            shipping_fee: None,
            shipping_discount: None,
            error: Some(err.response_message()),
        }
    }
}

impl From<&PlacedOrder> for PlaceOrderResponse {
    fn from(placed: &PlacedOrder) -> Self {
        Self {
            success: true,
            order_id: Some(placed.order_id),
            total_price: Some(placed.total_price),
            discount_amount: Some(placed.discount_amount),
            shipping_fee: Some(placed.shipping_fee),
            shipping_discount: Some(placed.shipping_discount),
            error: None,
        }
    }
}

/// Final charge, never below zero
pub fn order_total(subtotal: i64, shipping_fee: i64, outcome: CouponOutcome) -> i64 {
    (subtotal - outcome.order_discount + shipping_fee - outcome.shipping_discount).max(0)
}

fn insufficient_stock(product_name: &str) -> ServiceError {
    ServiceError::InsufficientStock(format!("{} does not have enough stock", product_name))
}

fn product_not_found(product_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Product {} not found", product_id))
}

#[derive(Debug, Clone)]
struct CheckoutLine {
    product_id: Uuid,
    product_name: String,
    priced: PricedLine,
}

impl CheckoutLine {
    /// Prices a line from the live product row and pre-checks its stock.
    fn from_product(product: ProductModel, quantity: i32) -> Result<Self, ServiceError> {
        if product.quantity < quantity {
            return Err(insufficient_stock(&product.name));
        }
        Ok(Self {
            product_id: product.id,
            priced: PricedLine {
                unit_price: resolve_unit_price(product.price, product.discount),
                quantity,
            },
            product_name: product.name,
        })
    }
}

/// Order placement: pricing, shipping, coupon and the atomic write.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<CheckoutConfig>,
    inventory: InventoryService,
    coupons: CouponService,
    carts: CartService,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            inventory: InventoryService::new(db.clone()),
            coupons: CouponService::new(db.clone()),
            carts: CartService::new(db.clone()),
            db,
            event_sender,
            config: Arc::new(config),
        }
    }

    /// Places an order and folds any failure into the response body.
    pub async fn checkout(&self, request: PlaceOrderRequest) -> PlaceOrderResponse {
        match self.place_order(request).await {
            Ok(placed) => PlaceOrderResponse::from(&placed),
            Err(e) => PlaceOrderResponse::failure(&e),
        }
    }

    /// Places an order in cart or buy-now mode.
    ///
    /// Every rejection except a lost stock race happens before the
    /// transaction opens. Inside it, the order row, the guarded stock
    /// decrements, the detail rows and (cart mode) the cart clear commit or
    /// roll back together.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, mode = ?request.mode))]
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder, ServiceError> {
        let result = self.try_place_order(request).await;

        match &result {
            Ok(placed) => {
                counter!("storefront_orders.placed", 1);
                info!(
                    order_id = %placed.order_id,
                    total_price = placed.total_price,
                    "Order placed successfully"
                );
            }
            Err(e) => {
                counter!("storefront_orders.placement_failures", 1, "kind" => e.kind());
                if e.is_internal() {
                    error!(error = %e, "Order placement failed");
                } else {
                    warn!(error = %e, "Order placement rejected");
                }
            }
        }

        result
    }

    async fn try_place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder, ServiceError> {
        request.validate()?;
        let mode = request.checkout_mode()?;

        let (lines, cart_id) = self.gather_lines(request.user_id, mode).await?;
        let subtotal = pricing::subtotal(lines.iter().map(|line| &line.priced));

        let quote = self.config.shipping.quote(
            request.receiver_province_code.as_deref(),
            request.receiver_district_code.as_deref(),
            request.payment_method,
        );

        let coupon_code = request.trimmed_coupon_code();
        let coupon = match &coupon_code {
            Some(code) => Some(
                self.coupons
                    .find_coupon(code)
                    .await?
                    .ok_or_else(|| CouponRejection::NotFound(code.clone()))?,
            ),
            None => None,
        };
        let outcome = apply_coupon(
            coupon.as_ref(),
            subtotal,
            quote.fee,
            self.config.percent_coupon_min_subtotal,
            Utc::now(),
        )?;
        let total_price = order_total(subtotal, quote.fee, outcome);

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(request.user_id),
            status: Set(OrderStatus::Pending),
            total_price: Set(total_price),
            discount_amount: Set(outcome.order_discount),
            shipping_fee: Set(quote.fee),
            shipping_discount: Set(outcome.shipping_discount),
            coupon_code: Set(coupon_code),
            receiver_name: Set(request.receiver_name),
            receiver_phone: Set(request.receiver_phone),
            receiver_address: Set(request.receiver_address),
            receiver_province_code: Set(request.receiver_province_code),
            receiver_district_code: Set(request.receiver_district_code),
            receiver_ward_code: Set(request.receiver_ward_code),
            receiver_street: Set(request.receiver_street),
            receiver_note: Set(request.receiver_note),
            // the fee above was quoted for this method
            payment_method: Set(request.payment_method),
            payment_status: Set(PaymentStatus::Unpaid),
            ..Default::default()
        };

        let saved = Self::commit_order(self.db.as_ref(), order, lines, cart_id).await?;

        let placed = PlacedOrder {
            order_id: saved.id,
            subtotal,
            total_price,
            discount_amount: outcome.order_discount,
            shipping_fee: quote.fee,
            shipping_discount: outcome.shipping_discount,
            shipping_tier: quote.tier,
            payment_method: request.payment_method,
            cart_id,
        };
        self.emit_events(&placed, saved.user_id).await;

        Ok(placed)
    }

    /// Reads and prices the lines to buy. Returns the cart id in cart mode.
    async fn gather_lines(
        &self,
        user_id: Uuid,
        mode: CheckoutMode,
    ) -> Result<(Vec<CheckoutLine>, Option<Uuid>), ServiceError> {
        match mode {
            CheckoutMode::Buy(ticket) => {
                let product = self
                    .inventory
                    .find_product(ticket.product_id)
                    .await?
                    .ok_or_else(|| product_not_found(ticket.product_id))?;
                let line = CheckoutLine::from_product(product, ticket.quantity)?;
                Ok((vec![line], None))
            }
            CheckoutMode::Cart => {
                let cart = self
                    .carts
                    .get_cart_lines(user_id)
                    .await?
                    .filter(|cart| !cart.lines.is_empty())
                    .ok_or_else(|| ServiceError::ValidationError("Your cart is empty".to_string()))?;

                let mut lines = Vec::with_capacity(cart.lines.len());
                for item in &cart.lines {
                    let product = self
                        .inventory
                        .find_product(item.product_id)
                        .await?
                        .ok_or_else(|| product_not_found(item.product_id))?;
                    lines.push(CheckoutLine::from_product(product, item.quantity)?);
                }
                Ok((lines, Some(cart.cart.id)))
            }
        }
    }

    async fn commit_order(
        db: &DatabaseConnection,
        order: order::ActiveModel,
        lines: Vec<CheckoutLine>,
        cart_id: Option<Uuid>,
    ) -> Result<order::Model, ServiceError> {
        db.transaction::<_, order::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let saved = order.insert(txn).await?;

                for line in &lines {
                    let affected = InventoryService::decrement_if_available(
                        txn,
                        line.product_id,
                        line.priced.quantity,
                    )
                    .await?;
                    if affected == 0 {
                        counter!("storefront_orders.stock_races_lost", 1);
                        return Err(insufficient_stock(&line.product_name));
                    }

                    order_detail::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(saved.id),
                        product_id: Set(line.product_id),
                        price: Set(line.priced.unit_price),
                        quantity: Set(line.priced.quantity),
                    }
                    .insert(txn)
                    .await?;
                }

                if let Some(cart_id) = cart_id {
                    CartService::clear_cart(txn, cart_id).await?;
                }

                Ok(saved)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::from(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn emit_events(&self, placed: &PlacedOrder, user_id: Uuid) {
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: placed.order_id,
                user_id,
                total_price: placed.total_price,
                payment_method: placed.payment_method,
            })
            .await;

        if let Some(cart_id) = placed.cart_id {
            self.event_sender
                .send_or_log(Event::CartCheckedOut {
                    cart_id,
                    order_id: placed.order_id,
                })
                .await;
        }
    }
}

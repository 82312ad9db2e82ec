#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde_json::Value;
use storefront_orders::{
    app_router,
    config::AppConfig,
    db,
    entities::{cart, cart_item, coupon, order, order_detail, product},
    events::{Event, EventSender},
    services::checkout::{OrderLineInput, OrderSource, PlaceOrderRequest},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub use storefront_orders::entities::order::PaymentMethod;

/// Application state over a fresh SQLite file, one per test.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    events: Mutex<mpsc::Receiver<Event>>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller tweak the configuration.
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection serializes SQLite writers the way row locks would.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.db_acquire_timeout_secs = 30;
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = app_router(state.clone());

        Self {
            router,
            state,
            events: Mutex::new(event_rx),
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Events emitted so far, in order.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    pub async fn seed_product(&self, name: &str, price: i64, discount: i32, quantity: i32) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            discount: Set(discount),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product")
    }

    pub async fn seed_coupon(&self, seed: CouponSeed) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(seed.code.to_string()),
            is_active: Set(seed.is_active),
            expiry_date: Set(seed.expiry_date),
            discount: Set(seed.discount),
            min_order: Set(seed.min_order),
            free_ship: Set(seed.free_ship),
            ship_discount_cap: Set(seed.ship_discount_cap),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed coupon")
    }

    /// Creates a cart for `user_id` holding `(product, quantity)` lines at the
    /// product's current list price.
    pub async fn seed_cart(&self, user_id: Uuid, lines: &[(&product::Model, i32)]) -> cart::Model {
        let db = self.state.db.as_ref();
        let now = Utc::now();
        let total = lines
            .iter()
            .map(|(p, qty)| p.price * i64::from(*qty))
            .sum::<i64>();

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            total: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("seed cart");

        for (offset, (p, qty)) in lines.iter().enumerate() {
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(p.id),
                quantity: Set(*qty),
                price: Set(p.price),
                created_at: Set(now + Duration::milliseconds(offset as i64)),
            }
            .insert(db)
            .await
            .expect("seed cart item");
        }

        cart
    }

    pub async fn product(&self, id: Uuid) -> product::Model {
        product::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load product")
            .expect("product exists")
    }

    pub async fn cart(&self, id: Uuid) -> cart::Model {
        cart::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load cart")
            .expect("cart exists")
    }

    /// `(product_id, quantity)` for every line of a cart, oldest first
    pub async fn cart_lines(&self, cart_id: Uuid) -> Vec<(Uuid, i32)> {
        use sea_orm::QueryOrder;

        cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(self.state.db.as_ref())
            .await
            .expect("load cart lines")
            .into_iter()
            .map(|line| (line.product_id, line.quantity))
            .collect()
    }

    pub async fn order(&self, id: Uuid) -> order::Model {
        order::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load order")
            .expect("order exists")
    }

    pub async fn order_count(&self) -> u64 {
        order::Entity::find()
            .count(self.state.db.as_ref())
            .await
            .expect("count orders")
    }

    pub async fn order_detail_count(&self) -> u64 {
        order_detail::Entity::find()
            .count(self.state.db.as_ref())
            .await
            .expect("count order details")
    }
}

/// Coupon row to insert; defaults to an active percent coupon valid for a week
pub struct CouponSeed {
    pub code: &'static str,
    pub is_active: bool,
    pub expiry_date: DateTime<Utc>,
    pub discount: i32,
    pub min_order: i64,
    pub free_ship: bool,
    pub ship_discount_cap: Option<i64>,
}

impl Default for CouponSeed {
    fn default() -> Self {
        Self {
            code: "SALE10",
            is_active: true,
            expiry_date: Utc::now() + Duration::days(7),
            discount: 10,
            min_order: 0,
            free_ship: false,
            ship_discount_cap: None,
        }
    }
}

pub fn buy_now(user_id: Uuid, product_id: Uuid, quantity: i32) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: vec![OrderLineInput {
            product_id,
            quantity,
        }],
        ..order_request(user_id, OrderSource::Buy)
    }
}

pub fn cart_checkout(user_id: Uuid) -> PlaceOrderRequest {
    order_request(user_id, OrderSource::Cart)
}

fn order_request(user_id: Uuid, mode: OrderSource) -> PlaceOrderRequest {
    PlaceOrderRequest {
        user_id,
        receiver_name: "Nguyen Van A".to_string(),
        receiver_address: "12 Nguyen Hue, Quan 1".to_string(),
        receiver_phone: "0912345678".to_string(),
        receiver_note: Some("Call before delivery".to_string()),
        coupon_code: None,
        mode,
        items: Vec::new(),
        payment_method: PaymentMethod::Cod,
        receiver_province_code: Some("79".to_string()),
        receiver_district_code: Some("760".to_string()),
        receiver_ward_code: None,
        receiver_street: None,
    }
}

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{CouponSeed, TestApp};
use serde_json::json;
use storefront_orders::entities::order::{PaymentMethod, PaymentStatus};
use uuid::Uuid;

fn buy_body(user_id: Uuid, product_id: Uuid, quantity: i32, payment: &str) -> serde_json::Value {
    json!({
        "userId": user_id,
        "receiverName": "Tran Thi B",
        "receiverAddress": "45 Le Loi, Quan 1",
        "receiverPhone": "0987654321",
        "mode": "buy",
        "items": [{ "productId": product_id, "quantity": quantity }],
        "paymentMethod": payment,
        "receiverProvinceCode": "79",
        "receiverDistrictCode": "760"
    })
}

#[tokio::test]
async fn post_checkout_places_cod_order() {
    let app = TestApp::new().await;
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 10, 5).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(buy_body(Uuid::new_v4(), laptop.id, 2, "COD")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["totalPrice"], json!(36_030_000));
    assert_eq!(body["discountAmount"], json!(0));
    assert_eq!(body["shippingFee"], json!(30_000));
    assert_eq!(body["shippingDiscount"], json!(0));
    assert!(body.get("error").is_none());

    let order_id: Uuid = serde_json::from_value(body["orderId"].clone()).unwrap();
    let (status, order) = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], json!("PENDING"));
    assert_eq!(order["payment_method"], json!("COD"));
    assert_eq!(order["details"][0]["price"], json!(18_000_000));
}

#[tokio::test]
async fn post_checkout_online_switches_payment() {
    let app = TestApp::new().await;
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 10, 5).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(buy_body(Uuid::new_v4(), laptop.id, 2, "ONLINE")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["totalPrice"], json!(36_025_000));

    let order_id: Uuid = serde_json::from_value(body["orderId"].clone()).unwrap();
    let order = app.order(order_id).await;
    assert_eq!(order.payment_method, PaymentMethod::Online);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn post_checkout_failure_keeps_result_shape() {
    let app = TestApp::new().await;
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 10, 5).await;
    app.seed_coupon(CouponSeed {
        code: "OLD",
        expiry_date: Utc::now() - Duration::days(1),
        ..Default::default()
    })
    .await;

    let mut request = buy_body(Uuid::new_v4(), laptop.id, 1, "COD");
    request["couponCode"] = json!("OLD");
    let (status, body) = app
        .request(Method::POST, "/api/v1/checkout", Some(request))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": "Coupon is invalid or expired" })
    );
}

#[tokio::test]
async fn post_checkout_short_stock_is_unprocessable() {
    let app = TestApp::new().await;
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 0, 1).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(buy_body(Uuid::new_v4(), laptop.id, 3, "COD")),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("ThinkPad X1 does not have enough stock"));
}

#[tokio::test]
async fn get_unknown_order_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", Uuid::new_v4()),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Not Found"));
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("up"));
    assert_eq!(body["database"], json!("up"));
}

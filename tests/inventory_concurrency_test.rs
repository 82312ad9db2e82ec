mod common;

use common::{buy_now, TestApp};
use futures::future::join_all;
use storefront_orders::errors::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn two_buyers_for_the_last_unit() {
    let app = TestApp::new().await;
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 0, 1).await;

    let attempts = (0..2).map(|_| {
        let checkout = app.state.checkout.clone();
        let request = buy_now(Uuid::new_v4(), laptop.id, 1);
        tokio::spawn(async move { checkout.checkout(request).await })
    });
    let responses: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("checkout task panicked"))
        .collect();

    let winners: Vec<_> = responses.iter().filter(|r| r.success).collect();
    let losers: Vec<_> = responses.iter().filter(|r| !r.success).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(losers.len(), 1);
    assert!(winners[0].order_id.is_some());
    assert_eq!(
        losers[0].error.as_deref(),
        Some("ThinkPad X1 does not have enough stock")
    );

    assert_eq!(app.product(laptop.id).await.quantity, 0);
    assert_eq!(app.order_count().await, 1);
}

#[tokio::test]
async fn concurrent_buyers_never_oversell() {
    let app = TestApp::new().await;
    let stock = 10;
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 0, stock).await;

    let attempts = (0..stock + 1).map(|_| {
        let checkout = app.state.checkout.clone();
        let request = buy_now(Uuid::new_v4(), laptop.id, 1);
        tokio::spawn(async move { checkout.place_order(request).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("checkout task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, stock as usize);
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(failure, ServiceError::InsufficientStock(_)));
    }

    assert_eq!(app.product(laptop.id).await.quantity, 0);
    assert_eq!(app.order_count().await, stock as u64);
    assert_eq!(app.order_detail_count().await, stock as u64);
}

#[tokio::test]
async fn multi_unit_buyers_respect_remaining_stock() {
    let app = TestApp::new().await;
    let (stock, per_order, attempts) = (7, 3, 5);
    let laptop = app.seed_product("ThinkPad X1", 20_000_000, 0, stock).await;

    let tasks = (0..attempts).map(|_| {
        let checkout = app.state.checkout.clone();
        let request = buy_now(Uuid::new_v4(), laptop.id, per_order);
        tokio::spawn(async move { checkout.place_order(request).await })
    });
    let successes = join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count() as i32;

    assert!(successes * per_order <= stock);
    assert!(stock < (successes + 1) * per_order);
    assert_eq!(
        app.product(laptop.id).await.quantity,
        stock - successes * per_order
    );
}

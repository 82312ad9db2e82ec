use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use crate::{
    entities::order::PaymentMethod,
    services::checkout::{PlaceOrderRequest, PlaceOrderResponse},
    AppState,
};

/// Place an order from the cart or a buy-now line.
///
/// Failures keep the `{ success: false, error }` body and carry the matching
/// status code. ONLINE orders are stored with their method and move to a
/// pending payment once committed; the payment redirect itself belongs to the
/// storefront.
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Response {
    let payment_method = request.payment_method;

    let placed = match state.checkout.place_order(request).await {
        Ok(placed) => placed,
        Err(e) => {
            return (e.status_code(), Json(PlaceOrderResponse::failure(&e))).into_response();
        }
    };

    if payment_method == PaymentMethod::Online {
        if let Err(e) = state.orders.mark_online_payment(placed.order_id).await {
            error!(
                order_id = %placed.order_id,
                error = %e,
                "Failed to mark online payment as pending"
            );
        }
    }

    (StatusCode::CREATED, Json(PlaceOrderResponse::from(&placed))).into_response()
}

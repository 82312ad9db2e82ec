use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use crate::{errors::ServiceError, services::orders::OrderWithDetails, AppState};

/// Get an order and its lines
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithDetails>, ServiceError> {
    let order = state.orders.get_order(id).await?;
    Ok(Json(order))
}

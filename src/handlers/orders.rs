use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ServiceError, models::OrderRecord, AppState};

use super::bearer;

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderRecord>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub new_status: String,
}

// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OrderListResponse>, ServiceError> {
    state.auth.authenticate(bearer(&headers))?;
    let orders = state.orders.list_records();
    let total = orders.len();
    Ok(Json(OrderListResponse { orders, total }))
}

// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<OrderRecord>, ServiceError> {
    state.auth.authenticate(bearer(&headers))?;
    Ok(Json(state.orders.get_record(order_id)?))
}

// PUT /api/v1/orders/{id}/status
//
// Validates the requested transition against the fulfillment graph; a
// rejected transition comes back as a 400 naming the violated rule.
pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderRecord>, ServiceError> {
    state.auth.authenticate(bearer(&headers))?;

    let new_status = request.new_status.parse().map_err(|_| {
        ServiceError::InvalidStatus(format!(
            "unknown status '{}'; expected one of Pending, Processing, Shipped, Delivered, Cancelled",
            request.new_status
        ))
    })?;

    let record = state.lifecycle.update_status(order_id, new_status).await?;
    Ok(Json(record))
}

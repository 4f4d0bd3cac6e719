use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{Cart, PriceBreakdown},
    AppState,
};

/// A cart plus its live price breakdown. The breakdown is derived on every
/// read; it is never stored.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub session_id: Uuid,
    pub cart: Cart,
    pub breakdown: PriceBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub delta: i32,
}

fn view(state: &AppState, session_id: Uuid, cart: Cart) -> CartView {
    let breakdown = state.pricing.compute(&cart);
    CartView {
        session_id,
        cart,
        breakdown,
    }
}

// GET /api/v1/carts/{session}
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<CartView> {
    let cart = state.carts.get(session_id);
    Json(view(&state, session_id, cart))
}

// POST /api/v1/carts/{session}/items
pub async fn add_item(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state.carts.add_item(session_id, request.product_id).await?;
    Ok(Json(view(&state, session_id, cart)))
}

// PATCH /api/v1/carts/{session}/items/{product_id}
pub async fn adjust_quantity(
    State(state): State<AppState>,
    Path((session_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<AdjustQuantityRequest>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state
        .carts
        .adjust_quantity(session_id, product_id, request.delta)
        .await?;
    Ok(Json(view(&state, session_id, cart)))
}

// DELETE /api/v1/carts/{session}/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    Path((session_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state.carts.remove_item(session_id, product_id).await?;
    Ok(Json(view(&state, session_id, cart)))
}

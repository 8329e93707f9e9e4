//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::CurrentBuyer;
use crate::core::ServerState;
use crate::gateway::PaymentHandle;
use crate::utils::{ApiResponse, AppResult};
use shared::order::{Order, OrderDetail};

pub async fn get_by_reference(
    State(state): State<ServerState>,
    buyer: CurrentBuyer,
    Path(reference): Path<String>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let detail = state.checkout.get_order(buyer.id, &reference).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn cancel(
    State(state): State<ServerState>,
    buyer: CurrentBuyer,
    Path(reference): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.checkout.cancel_order(buyer.id, &reference).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn pay(
    State(state): State<ServerState>,
    buyer: CurrentBuyer,
    Path(reference): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentHandle>>> {
    let handle = state.checkout.retry_payment(buyer.id, &reference).await?;
    Ok(Json(ApiResponse::success(handle)))
}

//! Checkout API
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/checkout | POST | 下单并创建支付 | 买家 |

use axum::extract::rejection::JsonRejection;
use axum::{Json, Router, extract::State, routing::post};

use crate::auth::CurrentBuyer;
use crate::checkout::{CheckoutRequest, CheckoutResult};
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/checkout", post(checkout))
}

async fn checkout(
    State(state): State<ServerState>,
    buyer: CurrentBuyer,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<CheckoutResult>>> {
    let Json(req) = payload.map_err(super::json_rejection)?;
    let result = state.checkout.checkout(buyer.id, req).await?;
    Ok(Json(ApiResponse::success(result)))
}

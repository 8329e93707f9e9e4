//! Payment gateway callback
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/payments/callback | POST | 网关异步通知 | 签名 |
//!
//! The body is read raw so it can be stored verbatim on the payment event.
//! Every authentic notification is acknowledged with 200, whatever the
//! outcome, so the gateway stops redelivering it.

use axum::body::Bytes;
use axum::{Json, Router, extract::State, routing::post};

use crate::core::ServerState;
use crate::gateway::PaymentCallback;
use crate::reconcile::ReconcileOutcome;
use crate::security_log;
use crate::utils::{ApiResponse, AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/payments/callback", post(callback))
}

async fn callback(
    State(state): State<ServerState>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<ReconcileOutcome>>> {
    let callback: PaymentCallback = serde_json::from_slice(&body).map_err(|e| {
        security_log!("WARN", "callback_malformed", error = e.to_string().as_str());
        AppError::validation(format!("Malformed payment notification: {e}"))
    })?;
    let raw = String::from_utf8_lossy(&body);

    let outcome = state.reconciler.handle(&callback, &raw).await?;
    tracing::info!(
        reference = %callback.order_id,
        transaction_id = %callback.transaction_id,
        transaction_status = %callback.transaction_status,
        ?outcome,
        "Payment notification processed"
    );
    Ok(Json(ApiResponse::success(outcome)))
}

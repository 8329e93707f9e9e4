//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 数据库、对账计数、通知队列 | 无 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::repository::notification::{self, QueueCounts};
use crate::reconcile::ReconcileCounters;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// ok | degraded
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub database: bool,
    pub reconciler: ReconcileCounters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<QueueCounts>,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let database = state.db.ping().await;
    let notifications = match notification::count_by_status(&state.db.pool).await {
        Ok(counts) => Some(counts),
        Err(e) => {
            tracing::warn!(error = %e, "Notification queue counts unavailable");
            None
        }
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (shared::util::now_millis() - state.started_at) / 1000,
        database,
        reconciler: state.reconcile_stats.snapshot(),
        notifications,
    })
}

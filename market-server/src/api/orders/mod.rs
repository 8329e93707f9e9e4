//! Order API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders/{reference} | GET | 订单及明细 |
//! | /api/orders/{reference}/cancel | POST | 买家取消 (仅未创建支付前) |
//! | /api/orders/{reference}/pay | POST | 获取 / 重新创建支付页面 |
//!
//! 全部需要买家令牌，且只能访问自己的订单。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{reference}", get(handler::get_by_reference))
        .route("/{reference}/cancel", post(handler::cancel))
        .route("/{reference}/pay", post(handler::pay))
}

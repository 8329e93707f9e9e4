//! API 路由模块
//!
//! - [`health`] - 健康检查和对账计数
//! - [`checkout`] - 下单
//! - [`orders`] - 订单查询、取消、重新支付
//! - [`payments`] - 支付网关回调

pub mod checkout;
pub mod health;
pub mod orders;
pub mod payments;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::utils::AppError;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Default)]
struct SnowflakeRequestId;

impl MakeRequestId for SnowflakeRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&shared::util::snowflake_id().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// All routes, no middleware, no state
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(payments::router())
}

/// Routes with tracing and request ids, bound to `state`
pub fn build_app(state: ServerState) -> Router {
    let header = http::HeaderName::from_static(REQUEST_ID_HEADER);
    build_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(header.clone(), SnowflakeRequestId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(header)),
    )
}

/// JSON body rejections are validation errors like any other malformed input
pub(crate) fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::validation(rejection.body_text())
}

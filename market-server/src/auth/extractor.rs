//! `CurrentBuyer` 提取器: 校验 Bearer 令牌并缓存到请求扩展中

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

/// Authenticated buyer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentBuyer {
    pub id: i64,
}

impl FromRequestParts<ServerState> for CurrentBuyer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(buyer) = parts.extensions.get::<CurrentBuyer>() {
            return Ok(*buyer);
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!("WARN", "auth_missing", uri = parts.uri.path());
                return Err(AppError::not_authenticated());
            }
        };

        match state.jwt.validate_token(token).and_then(|c| c.buyer_id()) {
            Ok(id) => {
                let buyer = CurrentBuyer { id };
                parts.extensions.insert(buyer);
                Ok(buyer)
            }
            Err(e) => {
                security_log!(
                    "WARN",
                    "auth_failed",
                    error = e.to_string().as_str(),
                    uri = parts.uri.path()
                );
                match e {
                    JwtError::Expired => Err(AppError::token_expired()),
                    _ => Err(AppError::invalid_token("Invalid token")),
                }
            }
        }
    }
}

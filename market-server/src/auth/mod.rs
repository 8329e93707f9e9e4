//! 认证模块
//!
//! 买家请求使用 Bearer JWT；支付回调使用网关签名 (见 `gateway`)。

mod extractor;
mod jwt;

pub use extractor::CurrentBuyer;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

//! Market Server - 合作社商城结算与支付对账
//!
//! # 架构概述
//!
//! - **结算** (`checkout`): 校验、定价、库存预留、下单
//! - **定价** (`pricing`): 会员价/限时价、运费、服务费、支付手续费
//! - **支付网关** (`gateway`): 创建托管支付页面、验证回调签名
//! - **对账** (`reconcile`): 幂等处理网关回调，推进订单状态
//! - **通知** (`notify`): 持久化任务队列，主通道失败后走备用通道
//! - **数据库** (`db`): SQLite (WAL) + sqlx
//!
//! # 模块结构
//!
//! ```text
//! market-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # 买家 JWT
//! ├── api/           # HTTP 路由和处理器
//! ├── checkout/      # 下单 / 取消 / 重新支付
//! ├── pricing/       # 价格计算
//! ├── gateway/       # 支付网关适配
//! ├── reconcile/     # 回调对账
//! ├── notify/        # 通知派发
//! ├── db/            # 数据库层
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod checkout;
pub mod core;
pub mod db;
pub mod gateway;
pub mod notify;
pub mod pricing;
pub mod reconcile;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentBuyer, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::init_logger_with_file;

/// Security logging macro
///
/// 签名失败、未知订单等异常写入 `security` target，日志过滤器默认保留 warn 级别。
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::warn!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 按配置初始化日志
pub fn setup_environment(config: &Config) {
    init_logger_with_file(
        Some(config.log_level.as_str()),
        // 生产环境固定输出 JSON，便于日志采集
        config.log_json || config.is_production(),
        config.log_dir.as_deref(),
    );
}

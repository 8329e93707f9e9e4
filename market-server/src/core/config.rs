//! 服务器配置
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | DATABASE_PATH | data/market.db | SQLite 数据库文件 |
//! | HTTP_PORT | 8080 | HTTP 服务端口 |
//! | ENVIRONMENT | development | 运行环境 |
//! | JWT_SECRET | (dev only default) | 买家令牌签名密钥 |
//! | JWT_ISSUER | market-accounts | 令牌签发者 |
//! | JWT_AUDIENCE | market-buyers | 令牌受众 |
//! | GATEWAY_BASE_URL | https://app.sandbox.midtrans.com | 支付网关地址 |
//! | GATEWAY_SERVER_KEY | (dev only default) | 支付网关服务端密钥 |
//! | GATEWAY_TIMEOUT_MS | 10000 | 网关请求超时(毫秒) |
//! | DB_TIMEOUT_MS | 5000 | 数据库等待/事务超时(毫秒) |
//! | SERVICE_FEE | 2000 | 服务费 |
//! | SERVICE_FEE_WAIVER_THRESHOLD | 100000 | 免服务费门槛 |
//! | PENDING_ORDER_TTL_SECS | 1800 | 未创建支付的订单保留时间 |
//! | SWEEP_INTERVAL_SECS | 60 | 过期订单清理间隔 |
//! | WHATSAPP_API_URL | - | WhatsApp 消息接口 (未设置则不启用) |
//! | WHATSAPP_API_TOKEN | - | WhatsApp 接口令牌 |
//! | SES_FROM_EMAIL | - | 邮件发件人 (未设置则不启用) |
//! | NOTIFY_MAX_ATTEMPTS | 5 | 每个通道最大发送次数 |
//! | LOG_LEVEL | info | 日志级别 |
//! | LOG_DIR | - | 日志目录 |
//! | LOG_JSON | false | JSON 格式日志 |

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Fee settings used by the pricing calculator
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Flat service fee in rupiah
    pub service_fee: i64,
    /// Service fee is waived when the discounted subtotal reaches this amount
    pub service_fee_waiver_threshold: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            service_fee: 2_000,
            service_fee_waiver_threshold: 100_000,
        }
    }
}

/// Payment gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Server key, used for API basic auth and callback signatures
    pub server_key: String,
    pub timeout: Duration,
}

/// Notification dispatcher settings
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub whatsapp_api_url: Option<String>,
    pub whatsapp_api_token: Option<String>,
    pub ses_from_email: Option<String>,
    /// Attempts per channel before the delivery is marked FAILED
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub send_timeout: Duration,
    pub scan_interval: Duration,
    pub concurrency: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            whatsapp_api_url: None,
            whatsapp_api_token: None,
            ses_from_email: None,
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            send_timeout: Duration::from_secs(10),
            scan_interval: Duration::from_secs(30),
            concurrency: 8,
        }
    }
}

/// Market server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    /// HTTP API port
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// HS256 secret for buyer bearer tokens (issued by the account service)
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Busy timeout, pool acquire timeout and per-unit-of-work deadline
    pub db_timeout: Duration,
    /// Age after which a PENDING order without a payment handle is cancelled
    pub pending_order_ttl: Duration,
    /// How often the stale order sweeper runs
    pub sweep_interval: Duration,
    pub pricing: PricingConfig,
    pub gateway: GatewayConfig,
    pub notify: NotifyConfig,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let pricing_defaults = PricingConfig::default();
        let notify_defaults = NotifyConfig::default();

        Ok(Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/market.db".into()),
            http_port: env_parse("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "market-accounts".into()),
            jwt_audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "market-buyers".into()),
            db_timeout: Duration::from_millis(env_parse("DB_TIMEOUT_MS", 5_000)),
            pending_order_ttl: Duration::from_secs(env_parse("PENDING_ORDER_TTL_SECS", 1_800)),
            sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", 60)),
            pricing: PricingConfig {
                service_fee: env_parse("SERVICE_FEE", pricing_defaults.service_fee),
                service_fee_waiver_threshold: env_parse(
                    "SERVICE_FEE_WAIVER_THRESHOLD",
                    pricing_defaults.service_fee_waiver_threshold,
                ),
            },
            gateway: GatewayConfig {
                base_url: std::env::var("GATEWAY_BASE_URL")
                    .unwrap_or_else(|_| "https://app.sandbox.midtrans.com".into()),
                server_key: Self::require_secret("GATEWAY_SERVER_KEY", &environment)?,
                timeout: Duration::from_millis(env_parse("GATEWAY_TIMEOUT_MS", 10_000)),
            },
            notify: NotifyConfig {
                whatsapp_api_url: env_opt("WHATSAPP_API_URL"),
                whatsapp_api_token: env_opt("WHATSAPP_API_TOKEN"),
                ses_from_email: env_opt("SES_FROM_EMAIL"),
                max_attempts: env_parse("NOTIFY_MAX_ATTEMPTS", notify_defaults.max_attempts),
                ..notify_defaults
            },
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),
            log_json: env_parse("LOG_JSON", false),
            environment,
        })
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

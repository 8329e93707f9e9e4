use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::auth::{JwtConfig, JwtService};
use crate::checkout::CheckoutService;
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::DbService;
use crate::gateway::{MidtransGateway, PaymentGateway};
use crate::notify::{
    ChannelRegistry, NotificationChannel, NotificationDispatcher, SesEmailChannel, WhatsAppChannel,
};
use crate::reconcile::{ReconcileStats, Reconciler};
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | SQLite 连接池 |
/// | jwt | 买家令牌验证 |
/// | checkout | 下单 / 取消 / 重新支付 |
/// | reconciler | 支付回调对账 |
/// | channels | 已启用的通知通道 |
///
/// Clone 只复制 Arc 和连接池句柄。
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub jwt: Arc<JwtService>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub channels: ChannelRegistry,
    pub checkout: CheckoutService,
    pub reconciler: Reconciler,
    pub reconcile_stats: Arc<ReconcileStats>,
    pub started_at: i64,
    /// 由 `start_background_tasks` 取走，交给通知派发器
    notify_wake_rx: Arc<Mutex<Option<mpsc::Receiver<()>>>>,
}

impl ServerState {
    /// 打开数据库并按配置接入真实的网关和通知通道
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_path, config.db_timeout).await?;

        let gateway = MidtransGateway::new(&config.gateway)
            .map_err(|e| AppError::internal(format!("Failed to build gateway client: {e}")))?;

        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
        if let Some(url) = &config.notify.whatsapp_api_url {
            let whatsapp = WhatsAppChannel::new(
                url.clone(),
                config.notify.whatsapp_api_token.clone(),
                config.notify.send_timeout,
            )
            .map_err(|e| AppError::internal(format!("Failed to build WhatsApp client: {e}")))?;
            channels.push(Arc::new(whatsapp));
        }
        if let Some(from) = &config.notify.ses_from_email {
            channels.push(Arc::new(SesEmailChannel::from_env(from.clone()).await));
        }
        tracing::info!(channels = channels.len(), "Notification channels configured");

        Ok(Self::with_parts(
            config.clone(),
            db,
            Arc::new(gateway),
            ChannelRegistry::new(channels),
        ))
    }

    /// 用已构建好的组件组装状态 (测试中注入替身网关和通道)
    pub fn with_parts(
        config: Config,
        db: DbService,
        gateway: Arc<dyn PaymentGateway>,
        channels: ChannelRegistry,
    ) -> Self {
        let jwt = Arc::new(JwtService::with_config(JwtConfig {
            secret: config.jwt_secret.clone(),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }));

        // 容量 1: 唤醒信号可以合并
        let (notify_wake, notify_wake_rx) = mpsc::channel(1);
        let reconcile_stats = Arc::new(ReconcileStats::default());

        let checkout = CheckoutService::new(
            db.pool.clone(),
            gateway.clone(),
            channels.clone(),
            notify_wake.clone(),
            config.pricing.clone(),
            config.db_timeout,
        );
        let reconciler = Reconciler::new(
            db.pool.clone(),
            gateway.clone(),
            channels.clone(),
            notify_wake,
            reconcile_stats.clone(),
            config.db_timeout,
        );

        Self {
            config,
            db,
            jwt,
            gateway,
            channels,
            checkout,
            reconciler,
            reconcile_stats,
            started_at: shared::util::now_millis(),
            notify_wake_rx: Arc::new(Mutex::new(Some(notify_wake_rx))),
        }
    }

    /// 通知派发器，测试中可直接调用 `process_due`
    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(
            self.db.pool.clone(),
            self.channels.clone(),
            self.config.notify.clone(),
        )
    }

    /// 启动后台任务:
    ///
    /// - `notification_dispatcher` (Worker): 投递通知，失败退避重试
    /// - `stale_order_sweeper` (Periodic): 取消超时未创建支付的订单并释放库存
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let wake_rx = self
            .notify_wake_rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        match wake_rx {
            Some(wake_rx) => {
                let dispatcher = self.dispatcher();
                let token = tasks.shutdown_token();
                tasks.spawn("notification_dispatcher", TaskKind::Worker, async move {
                    dispatcher.run(wake_rx, token).await;
                });
            }
            None => {
                tracing::warn!("Notification dispatcher already started, skipping");
            }
        }

        let checkout = self.checkout.clone();
        let ttl_ms = self.config.pending_order_ttl.as_millis() as i64;
        tasks.spawn_periodic("stale_order_sweeper", self.config.sweep_interval, move || {
            let checkout = checkout.clone();
            async move {
                let cutoff = shared::util::now_millis() - ttl_ms;
                match checkout.sweep_stale(cutoff).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(cancelled = n, "Stale order sweep finished"),
                    Err(e) => tracing::error!(error = %e, "Stale order sweep failed"),
                }
            }
        });

        tasks
    }
}

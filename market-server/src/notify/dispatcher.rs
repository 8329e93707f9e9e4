//! Notification Dispatcher - 通知投递
//!
//! 消费 `notification_task` 队列，按通道优先级投递：主通道失败后才尝试备用通道。
//! 被 reconciler 提交后的唤醒信号和定时扫描共同驱动，队列本身持久化在 SQLite。
//!
//! Delivery is at-least-once. A crash between a successful send and
//! `mark_sent` re-sends once the lease expires.

use super::{ChannelRegistry, NotificationMessage, SendError};
use crate::core::config::NotifyConfig;
use crate::db::repository::notification::{self, DueDelivery};
use futures::future::join_all;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

/// Deliveries fetched per scan round
const BATCH_SIZE: i64 = 50;

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Sent,
    /// Will be retried on the same channel
    Retrying,
    /// Channel exhausted
    Failed,
    /// Another worker holds the lease
    Skipped,
}

/// Exponential backoff: `base * 2^retry_count`, capped at `max`
pub fn backoff_delay(retry_count: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: SqlitePool,
    channels: ChannelRegistry,
    config: NotifyConfig,
    semaphore: Arc<Semaphore>,
}

impl NotificationDispatcher {
    pub fn new(pool: SqlitePool, channels: ChannelRegistry, config: NotifyConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            pool,
            channels,
            config,
            semaphore,
        }
    }

    /// Run until `shutdown` fires.
    ///
    /// `wake_rx` carries "new tasks committed" signals; the scan interval
    /// picks up retries whose backoff has elapsed.
    pub async fn run(self, mut wake_rx: mpsc::Receiver<()>, shutdown: CancellationToken) {
        tracing::info!(
            concurrency = self.config.concurrency,
            max_attempts = self.config.max_attempts,
            "NotificationDispatcher started"
        );

        if self.channels.is_empty() {
            tracing::warn!("No notification channel configured, tasks will be marked FAILED");
        }

        // Drain whatever a previous run left behind
        self.process_due().await;

        let mut scan_interval = tokio::time::interval(self.config.scan_interval);
        let mut wake_open = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("NotificationDispatcher shutting down");
                    break;
                }
                signal = wake_rx.recv(), if wake_open => {
                    match signal {
                        Some(()) => {
                            self.process_due().await;
                        }
                        None => {
                            tracing::debug!("Wake channel closed, falling back to periodic scan");
                            wake_open = false;
                        }
                    }
                }
                _ = scan_interval.tick() => {
                    self.process_due().await;
                }
            }
        }
    }

    /// Attempt every due delivery until none is left. Returns the number of attempts made.
    pub async fn process_due(&self) -> usize {
        let mut attempted = 0;
        loop {
            let now = shared::util::now_millis();
            let due = match notification::find_due(&self.pool, now, BATCH_SIZE).await {
                Ok(due) => due,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load due notifications");
                    return attempted;
                }
            };
            if due.is_empty() {
                return attempted;
            }

            let outcomes = join_all(due.into_iter().map(|d| self.attempt_bounded(d))).await;
            let progressed = outcomes
                .iter()
                .filter(|o| **o != AttemptOutcome::Skipped)
                .count();
            attempted += progressed;
            if progressed == 0 {
                return attempted;
            }
        }
    }

    async fn attempt_bounded(&self, delivery: DueDelivery) -> AttemptOutcome {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return AttemptOutcome::Skipped;
        };
        self.attempt(delivery).await
    }

    /// Lease, send and record a single delivery
    async fn attempt(&self, d: DueDelivery) -> AttemptOutcome {
        let now = shared::util::now_millis();
        let lease_until = now + (self.config.send_timeout.as_millis() as i64) * 2;
        match notification::claim(&self.pool, d.delivery_id, d.next_attempt_at, lease_until).await {
            Ok(true) => {}
            Ok(false) => return AttemptOutcome::Skipped,
            Err(e) => {
                tracing::error!(delivery_id = d.delivery_id, error = %e, "Failed to claim notification");
                return AttemptOutcome::Skipped;
            }
        }

        let Some(channel) = self.channels.get(d.channel) else {
            return self.give_up(&d, "channel not configured").await;
        };
        let message: NotificationMessage = match serde_json::from_str(&d.payload) {
            Ok(m) => m,
            Err(e) => return self.give_up(&d, &format!("invalid payload: {e}")).await,
        };

        let result = match tokio::time::timeout(self.config.send_timeout, channel.send(&d.target, &message)).await {
            Ok(r) => r,
            Err(_) => Err(SendError::Timeout),
        };

        match result {
            Ok(()) => {
                if let Err(e) = notification::mark_sent(&self.pool, d.delivery_id, d.task_id).await {
                    tracing::error!(delivery_id = d.delivery_id, error = %e, "Failed to record sent notification");
                }
                tracing::info!(
                    order_id = d.order_id,
                    kind = ?d.kind,
                    channel = d.channel.as_str(),
                    "Notification delivered"
                );
                AttemptOutcome::Sent
            }
            Err(e) => {
                let attempts_made = d.attempts as u32 + 1;
                if attempts_made >= self.config.max_attempts {
                    return self.give_up(&d, &e.to_string()).await;
                }
                let delay = backoff_delay(attempts_made - 1, self.config.base_delay, self.config.max_delay);
                let next = shared::util::now_millis() + delay.as_millis() as i64;
                tracing::warn!(
                    order_id = d.order_id,
                    channel = d.channel.as_str(),
                    attempt = attempts_made,
                    retry_in_secs = delay.as_secs(),
                    error = %e,
                    "Notification send failed, will retry"
                );
                if let Err(e) = notification::mark_retry(&self.pool, d.delivery_id, d.task_id, next, &e.to_string()).await {
                    tracing::error!(delivery_id = d.delivery_id, error = %e, "Failed to schedule notification retry");
                }
                AttemptOutcome::Retrying
            }
        }
    }

    /// Terminally fail this channel; the fallback (if any) becomes due
    async fn give_up(&self, d: &DueDelivery, error: &str) -> AttemptOutcome {
        match notification::mark_failed(&self.pool, d.delivery_id, d.task_id, error).await {
            Ok(true) => tracing::error!(
                order_id = d.order_id,
                kind = ?d.kind,
                channel = d.channel.as_str(),
                error = error,
                "Notification failed on every channel"
            ),
            Ok(false) => tracing::warn!(
                order_id = d.order_id,
                channel = d.channel.as_str(),
                error = error,
                "Notification channel exhausted, trying fallback"
            ),
            Err(e) => tracing::error!(delivery_id = d.delivery_id, error = %e, "Failed to record failed notification"),
        }
        AttemptOutcome::Failed
    }
}

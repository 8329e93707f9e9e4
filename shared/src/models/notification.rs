//! Notification task models

use serde::{Deserialize, Serialize};

/// Delivery state of a notification task or of one channel delivery
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum NotificationStatus {
    Queued,
    Sent,
    Failed,
}

/// Channel used to reach a buyer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum ChannelKind {
    Whatsapp,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Email => "email",
        }
    }
}

/// Buyer-facing outcome a notification is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum NotificationKind {
    PaymentReceived,
    PaymentFailed,
    OrderCancelled,
}

/// 通知任务 (one per order outcome)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NotificationTask {
    pub id: i64,
    pub order_id: i64,
    pub kind: NotificationKind,
    /// Rendered message body, JSON `{ "subject": .., "body": .. }`
    pub payload: String,
    pub status: NotificationStatus,
    pub attempts: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-channel delivery attempt state for a task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NotificationDelivery {
    pub id: i64,
    pub task_id: i64,
    pub channel: ChannelKind,
    /// Lower runs first; fallback channels have higher priority numbers
    pub priority: i64,
    pub target: String,
    pub status: NotificationStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub next_attempt_at: i64,
    pub updated_at: i64,
}

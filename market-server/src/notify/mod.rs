//! Notification Module
//!
//! Buyer notifications for order outcomes. The reconciler only writes
//! `notification_task` rows; the [`NotificationDispatcher`] delivers them
//! off the request path through a primary channel with a fallback.

pub mod dispatcher;
pub mod email;
pub mod templates;
pub mod whatsapp;

use crate::db::repository::notification::DeliveryTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::ChannelKind;
use shared::order::Order;
use std::sync::Arc;
use thiserror::Error;

pub use dispatcher::NotificationDispatcher;
pub use email::SesEmailChannel;
pub use whatsapp::WhatsAppChannel;

/// Rendered message, stored as the task payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

/// Delivery failure for a single attempt
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("send timed out")]
    Timeout,
}

/// A way to reach the buyer
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, target: &str, message: &NotificationMessage) -> Result<(), SendError>;
}

/// Configured channels in priority order (first = primary)
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&Arc<dyn NotificationChannel>> {
        self.channels.iter().find(|c| c.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Delivery targets for an order, skipping channels the order has no address for
    pub fn targets_for(&self, order: &Order) -> Vec<DeliveryTarget> {
        self.channels
            .iter()
            .filter_map(|channel| {
                let target = match channel.kind() {
                    ChannelKind::Whatsapp => Some(order.shipping.phone.trim()),
                    ChannelKind::Email => order.contact_email.as_deref().map(str::trim),
                }?;
                (!target.is_empty()).then(|| DeliveryTarget {
                    channel: channel.kind(),
                    target: target.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};

    struct Noop(ChannelKind);

    #[async_trait]
    impl NotificationChannel for Noop {
        fn kind(&self) -> ChannelKind {
            self.0
        }

        async fn send(&self, _: &str, _: &NotificationMessage) -> Result<(), SendError> {
            Ok(())
        }
    }

    fn order(email: Option<&str>) -> Order {
        Order {
            id: 1,
            reference: "ORD-20261016-QWERTY".into(),
            buyer_id: 1,
            status: OrderStatus::Paid,
            payment_status: PaymentStatus::Paid,
            subtotal: 1,
            discount: 0,
            shipping_cost: 0,
            service_fee: 0,
            payment_fee: 0,
            total: 1,
            shipping: ShippingAddress {
                recipient_name: "Rina".into(),
                phone: "+62857".into(),
                address_line: "Jl. Anggrek".into(),
                city: "Malang".into(),
                province: "Jawa Timur".into(),
                postal_code: "65111".into(),
            },
            contact_email: email.map(str::to_string),
            payment_method: PaymentMethod::Gopay,
            payment_token: None,
            payment_url: None,
            gateway_txn_id: None,
            stock_restored: false,
            paid_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn targets_follow_channel_priority() {
        let registry = ChannelRegistry::new(vec![
            Arc::new(Noop(ChannelKind::Whatsapp)),
            Arc::new(Noop(ChannelKind::Email)),
        ]);
        let targets = registry.targets_for(&order(Some("rina@example.id")));
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].channel, ChannelKind::Whatsapp);
        assert_eq!(targets[1].target, "rina@example.id");

        let targets = registry.targets_for(&order(None));
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn unconfigured_channels_are_skipped() {
        let registry = ChannelRegistry::new(vec![Arc::new(Noop(ChannelKind::Email))]);
        assert!(registry.targets_for(&order(None)).is_empty());
        assert!(registry.get(ChannelKind::Whatsapp).is_none());
    }
}

//! Order state transition with its side effects, inside one unit of work.
//!
//! Shared by the callback reconciler, buyer cancellation and the stale order sweeper.

use super::mapping::notification_kind;
use crate::db::repository::{RepoResult, Tx, notification, order, stock};
use crate::notify::{ChannelRegistry, templates};
use shared::order::{Order, OrderStatus};

/// What a successful transition did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub stock_restored: bool,
    pub notification_enqueued: bool,
}

/// Move `current` from PENDING to `to` and apply compensation + notification.
///
/// Returns `None` when the guarded update lost (order no longer PENDING).
/// The caller commits.
pub async fn apply_transition(
    tx: &mut Tx<'_>,
    current: &Order,
    to: OrderStatus,
    gateway_txn_id: Option<&str>,
    channels: &ChannelRegistry,
) -> RepoResult<Option<Applied>> {
    if !current.status.can_transition_to(to) {
        return Ok(None);
    }
    if !order::transition(tx, current.id, current.status, to, gateway_txn_id).await? {
        return Ok(None);
    }

    let stock_restored = if to.is_failure() {
        stock::restore_for_order(tx, current.id).await?
    } else {
        false
    };

    let mut notification_enqueued = false;
    if let Some(kind) = notification_kind(to) {
        let updated = Order {
            status: to,
            payment_status: to.payment_status(),
            ..current.clone()
        };
        let message = templates::render(kind, &updated);
        let payload = serde_json::to_string(&message)
            .map_err(|e| crate::db::repository::RepoError::Database(e.to_string()))?;
        let targets = channels.targets_for(&updated);
        notification_enqueued = notification::enqueue(tx, current.id, kind, &payload, &targets)
            .await?
            .is_some();
    }

    Ok(Some(Applied {
        from: current.status,
        to,
        stock_restored,
        notification_enqueued,
    }))
}

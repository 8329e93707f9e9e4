//! Gateway status → order status

use crate::gateway::{FraudStatus, GatewayStatus, TransactionStatus};
use shared::models::NotificationKind;
use shared::order::OrderStatus;

/// Target order status for a gateway status, `None` when nothing should change.
///
/// | transaction | fraud | target |
/// |-------------|-------|--------|
/// | settlement | none / accept | PAID |
/// | capture | accept | PAID |
/// | capture | challenge / none | - |
/// | pending | * | - |
/// | cancel, expire | * | CANCELLED |
/// | deny, failure | * | FAILED |
/// | * | deny | FAILED |
/// | other | * | - |
pub fn target_status(status: &GatewayStatus) -> Option<OrderStatus> {
    if status.fraud == FraudStatus::Deny {
        return Some(OrderStatus::Failed);
    }
    match (&status.transaction, status.fraud) {
        (TransactionStatus::Settlement, FraudStatus::None | FraudStatus::Accept) => Some(OrderStatus::Paid),
        (TransactionStatus::Settlement, FraudStatus::Deny) => Some(OrderStatus::Failed),
        (TransactionStatus::Settlement, FraudStatus::Challenge) => None,
        (TransactionStatus::Capture, FraudStatus::Accept) => Some(OrderStatus::Paid),
        (TransactionStatus::Capture, _) => None,
        (TransactionStatus::Pending, _) => None,
        (TransactionStatus::Cancel | TransactionStatus::Expire, _) => Some(OrderStatus::Cancelled),
        (TransactionStatus::Deny | TransactionStatus::Failure, _) => Some(OrderStatus::Failed),
        (TransactionStatus::Other(_), _) => None,
    }
}

/// Buyer notification for a terminal status
pub fn notification_kind(status: OrderStatus) -> Option<NotificationKind> {
    match status {
        OrderStatus::Paid => Some(NotificationKind::PaymentReceived),
        OrderStatus::Failed => Some(NotificationKind::PaymentFailed),
        OrderStatus::Cancelled => Some(NotificationKind::OrderCancelled),
        OrderStatus::Pending | OrderStatus::Processing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(tx: &str, fraud: Option<&str>) -> GatewayStatus {
        GatewayStatus {
            transaction: TransactionStatus::parse(tx),
            fraud: FraudStatus::parse(fraud),
        }
    }

    #[test]
    fn paid_mapping() {
        assert_eq!(target_status(&status("settlement", None)), Some(OrderStatus::Paid));
        assert_eq!(target_status(&status("settlement", Some("accept"))), Some(OrderStatus::Paid));
        assert_eq!(target_status(&status("capture", Some("accept"))), Some(OrderStatus::Paid));
    }

    #[test]
    fn waiting_states_are_noop() {
        assert_eq!(target_status(&status("capture", Some("challenge"))), None);
        assert_eq!(target_status(&status("pending", None)), None);
        assert_eq!(target_status(&status("refund", None)), None);
        assert_eq!(target_status(&status("authorize", None)), None);
    }

    #[test]
    fn failure_mapping() {
        assert_eq!(target_status(&status("expire", None)), Some(OrderStatus::Cancelled));
        assert_eq!(target_status(&status("cancel", None)), Some(OrderStatus::Cancelled));
        assert_eq!(target_status(&status("deny", None)), Some(OrderStatus::Failed));
        assert_eq!(target_status(&status("failure", None)), Some(OrderStatus::Failed));
        assert_eq!(target_status(&status("capture", Some("deny"))), Some(OrderStatus::Failed));
        assert_eq!(target_status(&status("settlement", Some("deny"))), Some(OrderStatus::Failed));
    }

    #[test]
    fn every_terminal_status_has_a_notification() {
        for s in [OrderStatus::Paid, OrderStatus::Failed, OrderStatus::Cancelled] {
            assert!(notification_kind(s).is_some());
        }
        assert!(notification_kind(OrderStatus::Pending).is_none());
    }
}

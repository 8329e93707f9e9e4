//! Order and payment status enums
//!
//! | From | To | Meaning |
//! |------|----|---------|
//! | PENDING | PAID | gateway settled the payment |
//! | PENDING | PROCESSING | handed to fulfilment |
//! | PENDING | CANCELLED | buyer cancelled, gateway cancel/expire |
//! | PENDING | FAILED | gateway deny/failure, fraud deny |
//!
//! Everything except PENDING is terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status (订单状态)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Paid,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Terminal states that give the reserved stock back
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed)
    }

    /// Whether `self -> next` is a defined edge.
    ///
    /// Staying in PENDING is not a transition; callers treat it as a no-op.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }

    /// Payment status that accompanies an order status
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Pending => PaymentStatus::Pending,
            Self::Processing | Self::Paid => PaymentStatus::Paid,
            Self::Cancelled | Self::Failed => PaymentStatus::Failed,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status (支付状态)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

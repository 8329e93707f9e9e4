//! Payment reconciliation
//!
//! | Module | |
//! |--------|-|
//! | [`mapping`] | gateway status → order status |
//! | [`transition`] | guarded transition + stock restore + notification |
//! | [`reconciler`] | callback processing |
//! | [`stats`] | outcome counters |

pub mod mapping;
pub mod reconciler;
pub mod stats;
pub mod transition;

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

pub use reconciler::Reconciler;
pub use stats::{ReconcileCounters, ReconcileStats};

/// Result of processing one authenticated (or unknown-order) callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileOutcome {
    Applied { from: OrderStatus, to: OrderStatus },
    NoOp,
    Duplicate,
    IllegalTransition { current: OrderStatus, attempted: OrderStatus },
    UnknownOrder,
    InternalError,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("callback signature is invalid")]
    SignatureInvalid,
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::SignatureInvalid => AppError::new(ErrorCode::PaymentSignatureInvalid),
        }
    }
}

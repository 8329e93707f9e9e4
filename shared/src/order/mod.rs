//! Order Module
//!
//! Types shared by checkout and payment reconciliation:
//! - Status: order / payment state machines
//! - Types: order records, line item snapshots, cost breakdown

pub mod status;
pub mod types;

// Re-exports
pub use status::{OrderStatus, PaymentStatus};
pub use types::*;

//! Pricing Module
//!
//! Server-side price resolution and fee calculation for checkout.
//! Client-supplied amounts are never trusted.

mod calculator;
pub mod shipping;

pub use calculator::*;

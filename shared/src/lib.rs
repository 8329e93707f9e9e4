//! Shared types for the cooperative marketplace
//!
//! Common types used by market-server and its clients including
//! error types, response structures, order/product models and utilities.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

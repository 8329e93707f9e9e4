//! Data models
//!
//! Shared between market-server and the storefront (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all money is `i64` minor units.

pub mod buyer;
pub mod notification;
pub mod product;

// Re-exports
pub use buyer::*;
pub use notification::*;
pub use product::*;

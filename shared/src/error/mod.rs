//! 统一错误体系
//!
//! [`ErrorCode`] is the number the storefront switches on. Each code has a
//! fixed HTTP status and [`ErrorCategory`]. Handlers return [`AppError`],
//! which renders as an [`ApiResponse`] body.
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::out_of_stock(7, 2, Some(1));
//! assert_eq!(err.code, ErrorCode::ProductOutOfStock);
//! assert_eq!(err.http_status().as_u16(), 409);
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};

//! 错误码表
//!
//! Every code the storefront can receive is declared once in the table below,
//! together with its HTTP status, category and default message. Codes are
//! serialized as plain numbers.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::ErrorCategory;

macro_rules! error_codes {
    ($(
        $(#[$doc:meta])*
        $name:ident = $value:literal, $category:ident, $status:ident, $message:literal;
    )*) => {
        /// Stable numeric error code
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u16", try_from = "u16")]
        #[repr(u16)]
        pub enum ErrorCode {
            $( $(#[$doc])* $name = $value, )*
        }

        impl ErrorCode {
            /// All declared codes, in table order
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$name),*];

            pub const fn category(&self) -> ErrorCategory {
                match self {
                    $( ErrorCode::$name => ErrorCategory::$category, )*
                }
            }

            pub fn http_status(&self) -> StatusCode {
                match self {
                    $( ErrorCode::$name => StatusCode::$status, )*
                }
            }

            /// Default English message, used when the caller gives none
            pub const fn message(&self) -> &'static str {
                match self {
                    $( ErrorCode::$name => $message, )*
                }
            }
        }

        impl TryFrom<u16> for ErrorCode {
            type Error = InvalidErrorCode;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok(ErrorCode::$name), )*
                    other => Err(InvalidErrorCode(other)),
                }
            }
        }
    };
}

error_codes! {
    Success = 0, General, OK, "OK";
    /// Request body or query failed a field check
    ValidationFailed = 2, General, BAD_REQUEST, "Validation failed";
    NotFound = 3, General, NOT_FOUND, "Resource not found";
    /// A UNIQUE constraint rejected the write
    AlreadyExists = 4, General, CONFLICT, "Resource already exists";

    NotAuthenticated = 1001, Auth, UNAUTHORIZED, "Buyer is not authenticated";
    TokenExpired = 1003, Auth, UNAUTHORIZED, "Authentication token has expired";
    TokenInvalid = 1004, Auth, UNAUTHORIZED, "Authentication token is invalid";

    /// Token subject has no buyer row
    BuyerNotFound = 3001, Buyer, NOT_FOUND, "Buyer not found";

    /// Unknown reference, or the order belongs to another buyer
    OrderNotFound = 4001, Order, NOT_FOUND, "Order not found";
    OrderEmpty = 4007, Order, BAD_REQUEST, "Order has no items";
    OrderNotCancellable = 4008, Order, CONFLICT, "Order can no longer be cancelled";
    OrderIllegalTransition = 4009, Order, CONFLICT, "Order status change is not allowed";
    /// Every generated reference collided
    OrderReferenceExhausted = 4010, Order, INTERNAL_SERVER_ERROR, "Could not allocate an order reference";

    PaymentInvalidMethod = 5003, Payment, BAD_REQUEST, "Unsupported payment method";
    /// Snap rejected the transaction or could not be reached
    PaymentGatewayError = 5006, Payment, BAD_GATEWAY, "Payment gateway is unavailable";
    PaymentSignatureInvalid = 5007, Payment, FORBIDDEN, "Payment notification signature is invalid";

    ProductOutOfStock = 6003, Stock, CONFLICT, "Product is out of stock";

    InternalError = 9001, System, INTERNAL_SERVER_ERROR, "Internal server error";
    DatabaseError = 9002, System, INTERNAL_SERVER_ERROR, "Database error";
    /// A unit of work ran past its deadline
    TimeoutError = 9004, System, SERVICE_UNAVAILABLE, "Operation timed out";
    /// SQLite writer lock held too long, retry later
    SystemBusy = 9404, System, SERVICE_UNAVAILABLE, "System busy, please retry later";
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// The same request may succeed if retried unchanged
    pub const fn is_transient(&self) -> bool {
        matches!(self, ErrorCode::TimeoutError | ErrorCode::SystemBusy)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Number that is not in the code table
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

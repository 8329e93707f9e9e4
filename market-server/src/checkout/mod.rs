//! Checkout
//!
//! Validate → price → one unit of work (order + line items + stock
//! reservation) → payment handle after commit.

pub mod reference;
pub mod service;
pub mod validator;

use crate::db::repository::RepoError;
use crate::gateway::PaymentHandle;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::order::{OrderCosts, ShippingAddress};
use thiserror::Error;

pub use service::CheckoutService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: ShippingAddress,
    /// Payment method identifier, e.g. `bank_transfer`
    pub payment_method: String,
    #[serde(default)]
    pub use_member_price: bool,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order_id: i64,
    pub reference: String,
    pub costs: OrderCosts,
    pub payment: PaymentHandle,
}

/// Failures inside the checkout unit of work
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("product {product_id} out of stock (requested {requested})")]
    OutOfStock {
        product_id: i64,
        requested: i64,
        available: Option<i64>,
    },

    #[error("order reference already taken")]
    ReferenceCollision,

    #[error("checkout timed out")]
    Timeout,

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::OutOfStock {
                product_id,
                requested,
                available,
            } => AppError::out_of_stock(product_id, requested, available),
            CheckoutError::ReferenceCollision => AppError::new(ErrorCode::OrderReferenceExhausted),
            CheckoutError::Timeout => AppError::timeout("checkout timed out"),
            CheckoutError::Repo(e) => e.into(),
        }
    }
}

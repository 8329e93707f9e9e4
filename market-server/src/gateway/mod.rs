//! Payment Gateway Adapter
//!
//! Hosted-checkout gateway seam. Checkout asks for a payment handle after its
//! transaction commits; the callback endpoint asks the gateway to authenticate
//! and normalize asynchronous status notifications.

pub mod midtrans;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::order::{Order, OrderLineItem};
use thiserror::Error;

pub use midtrans::MidtransGateway;

/// Token + redirect URL for the hosted payment page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHandle {
    pub token: String,
    pub redirect_url: String,
}

/// Asynchronous payment notification, as posted by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    /// Our order reference
    pub order_id: String,
    pub transaction_id: String,
    pub transaction_status: String,
    pub status_code: String,
    pub signature_key: String,
    /// Decimal string, e.g. "114000.00"
    pub gross_amount: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub settlement_time: Option<String>,
}

impl PaymentCallback {
    /// Gross amount in whole rupiah; `None` if it has a non-zero fraction or is malformed
    pub fn gross_amount_minor(&self) -> Option<i64> {
        let (whole, frac) = match self.gross_amount.split_once('.') {
            Some((w, f)) => (w, f),
            None => (self.gross_amount.as_str(), ""),
        };
        if !frac.chars().all(|c| c == '0') {
            return None;
        }
        whole.parse().ok()
    }
}

/// Transaction status reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
    Failure,
    /// refund, partial_refund, authorize or anything new
    Other(String),
}

impl TransactionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "capture" => Self::Capture,
            "settlement" => Self::Settlement,
            "pending" => Self::Pending,
            "deny" => Self::Deny,
            "cancel" => Self::Cancel,
            "expire" => Self::Expire,
            "failure" => Self::Failure,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Capture => "capture",
            Self::Settlement => "settlement",
            Self::Pending => "pending",
            Self::Deny => "deny",
            Self::Cancel => "cancel",
            Self::Expire => "expire",
            Self::Failure => "failure",
            Self::Other(s) => s,
        }
    }
}

/// Fraud screening result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudStatus {
    /// Not reported (most non-card methods)
    None,
    Accept,
    Challenge,
    Deny,
}

impl FraudStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("accept") => Self::Accept,
            Some("challenge") => Self::Challenge,
            Some("deny") => Self::Deny,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Accept => Some("accept"),
            Self::Challenge => Some("challenge"),
            Self::Deny => Some("deny"),
        }
    }
}

/// Normalized gateway status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatus {
    pub transaction: TransactionStatus,
    pub fraud: FraudStatus,
}

impl GatewayStatus {
    pub fn from_callback(callback: &PaymentCallback) -> Self {
        Self {
            transaction: TransactionStatus::parse(&callback.transaction_status),
            fraud: FraudStatus::parse(callback.fraud_status.as_deref()),
        }
    }

    /// Idempotency key component, e.g. `settlement` or `capture/challenge`.
    ///
    /// The fraud verdict is part of the key: a challenged capture followed by
    /// an accepted capture are two distinct events.
    pub fn event_key(&self) -> String {
        match self.fraud.as_str() {
            Some(fraud) => format!("{}/{fraud}", self.transaction.as_str()),
            None => self.transaction.as_str().to_string(),
        }
    }
}

/// Result of authenticating a callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub authentic: bool,
    pub status: GatewayStatus,
}

/// Gateway call failures
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(String),

    #[error("gateway timed out")]
    Timeout,

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Http(err.to_string())
        }
    }
}

/// Payment gateway seam
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted-checkout handle for a committed PENDING order
    async fn create_handle(
        &self,
        order: &Order,
        items: &[OrderLineItem],
    ) -> Result<PaymentHandle, GatewayError>;

    /// Authenticate a callback and normalize its status
    fn verify(&self, callback: &PaymentCallback) -> Verification;
}

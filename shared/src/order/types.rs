//! Order records, cost breakdown and payment methods

use super::status::{OrderStatus, PaymentStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment method offered at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentMethod {
    /// Virtual account bank transfer (BCA/BNI/BRI)
    BankTransfer,
    /// Mandiri bill payment
    Echannel,
    Gopay,
    Shopeepay,
    Qris,
    CreditCard,
    /// Convenience store (Indomaret/Alfamart)
    Cstore,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        Self::BankTransfer,
        Self::Echannel,
        Self::Gopay,
        Self::Shopeepay,
        Self::Qris,
        Self::CreditCard,
        Self::Cstore,
    ];

    /// Identifier shared with the storefront and the payment gateway
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::Echannel => "echannel",
            Self::Gopay => "gopay",
            Self::Shopeepay => "shopeepay",
            Self::Qris => "qris",
            Self::CreditCard => "credit_card",
            Self::Cstore => "cstore",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown payment method identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownPaymentMethod(s.to_string()))
    }
}

/// Shipping address snapshot stored on the order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

/// Cost breakdown in minor units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OrderCosts {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub service_fee: i64,
    pub payment_fee: i64,
    pub total: i64,
}

impl OrderCosts {
    /// Build a breakdown, deriving `total` from the components
    pub fn new(subtotal: i64, discount: i64, shipping: i64, service_fee: i64, payment_fee: i64) -> Self {
        Self {
            subtotal,
            discount,
            shipping,
            service_fee,
            payment_fee,
            total: subtotal - discount + shipping + service_fee + payment_fee,
        }
    }

    /// `total == subtotal - discount + shipping + service_fee + payment_fee`
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal - self.discount + self.shipping + self.service_fee + self.payment_fee
    }
}

/// Order record (订单)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Human-readable unique reference, also the gateway order id
    pub reference: String,
    pub buyer_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: i64,
    pub discount: i64,
    pub shipping_cost: i64,
    pub service_fee: i64,
    pub payment_fee: i64,
    pub total: i64,
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub shipping: ShippingAddress,
    pub contact_email: Option<String>,
    pub payment_method: PaymentMethod,
    /// Gateway checkout token, set once a handle exists
    pub payment_token: Option<String>,
    pub payment_url: Option<String>,
    pub gateway_txn_id: Option<String>,
    /// Set once reserved stock has been returned
    pub stock_restored: bool,
    pub paid_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn costs(&self) -> OrderCosts {
        OrderCosts {
            subtotal: self.subtotal,
            discount: self.discount,
            shipping: self.shipping_cost,
            service_fee: self.service_fee,
            payment_fee: self.payment_fee,
            total: self.total,
        }
    }

    pub fn has_payment_handle(&self) -> bool {
        self.payment_token.is_some()
    }
}

/// Immutable line item snapshot (订单明细)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    /// Catalog price at checkout time
    pub base_price: i64,
    /// Price actually charged per unit (flash sale / member / base)
    pub unit_price: i64,
    pub weight_grams: i64,
    pub quantity: i64,
    /// `unit_price * quantity`
    pub subtotal: i64,
}

/// Order with its line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLineItem>,
}

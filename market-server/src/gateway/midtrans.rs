//! Snap hosted checkout via REST API (no SDK dependency)
//!
//! - `POST {base}/snap/v1/transactions`, basic auth with the server key
//! - Notification signature: `sha512(order_id + status_code + gross_amount + server_key)`

use super::{
    GatewayError, GatewayStatus, PaymentCallback, PaymentGateway, PaymentHandle, Verification,
};
use crate::core::config::GatewayConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha512};
use shared::order::{Order, OrderLineItem, PaymentMethod};

/// Snap limits item names to 50 characters
const MAX_ITEM_NAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
struct SnapResponse {
    token: String,
    redirect_url: String,
}

/// Midtrans-compatible Snap gateway
#[derive(Clone)]
pub struct MidtransGateway {
    client: reqwest::Client,
    base_url: String,
    server_key: String,
}

impl MidtransGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Http(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            server_key: config.server_key.clone(),
        })
    }

    /// Expected signature for a notification
    pub fn signature(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        signature(order_id, status_code, gross_amount, &self.server_key)
    }
}

fn signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(lhs: &[u8], rhs: &[u8]) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in lhs.iter().zip(rhs.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

/// Snap `enabled_payments` identifiers for a checkout method
fn enabled_payments(method: PaymentMethod) -> &'static [&'static str] {
    match method {
        PaymentMethod::BankTransfer => &["bca_va", "bni_va", "bri_va", "permata_va", "other_va"],
        PaymentMethod::Echannel => &["echannel"],
        PaymentMethod::Gopay => &["gopay"],
        PaymentMethod::Shopeepay => &["shopeepay"],
        PaymentMethod::Qris => &["other_qris"],
        PaymentMethod::CreditCard => &["credit_card"],
        PaymentMethod::Cstore => &["indomaret", "alfamart"],
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_ITEM_NAME_LEN).collect()
}

/// Snap transaction body. Item prices sum to `gross_amount`.
pub(crate) fn build_transaction_request(order: &Order, items: &[OrderLineItem]) -> Value {
    let mut item_details: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "id": item.product_id.to_string(),
                "price": item.unit_price,
                "quantity": item.quantity,
                "name": truncate_name(&item.product_name),
            })
        })
        .collect();

    for (id, name, amount) in [
        ("SHIPPING", "Ongkos kirim", order.shipping_cost),
        ("SERVICE_FEE", "Biaya layanan", order.service_fee),
        ("PAYMENT_FEE", "Biaya pembayaran", order.payment_fee),
    ] {
        if amount > 0 {
            item_details.push(json!({ "id": id, "price": amount, "quantity": 1, "name": name }));
        }
    }

    let address = &order.shipping;
    json!({
        "transaction_details": {
            "order_id": order.reference,
            "gross_amount": order.total,
        },
        "item_details": item_details,
        "customer_details": {
            "first_name": address.recipient_name,
            "phone": address.phone,
            "email": order.contact_email,
            "shipping_address": {
                "first_name": address.recipient_name,
                "phone": address.phone,
                "address": address.address_line,
                "city": address.city,
                "postal_code": address.postal_code,
                "country_code": "IDN",
            },
        },
        "enabled_payments": enabled_payments(order.payment_method),
    })
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_handle(
        &self,
        order: &Order,
        items: &[OrderLineItem],
    ) -> Result<PaymentHandle, GatewayError> {
        let body = build_transaction_request(order, items);
        let resp = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(&self.server_key, None::<&str>)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let snap: SnapResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        tracing::debug!(reference = %order.reference, "Snap transaction created");
        Ok(PaymentHandle {
            token: snap.token,
            redirect_url: snap.redirect_url,
        })
    }

    fn verify(&self, callback: &PaymentCallback) -> Verification {
        let expected = self.signature(&callback.order_id, &callback.status_code, &callback.gross_amount);
        let provided = callback.signature_key.trim().to_ascii_lowercase();
        Verification {
            authentic: constant_time_eq(expected.as_bytes(), provided.as_bytes()),
            status: GatewayStatus::from_callback(callback),
        }
    }
}

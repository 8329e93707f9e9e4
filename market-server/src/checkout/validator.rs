//! Pricing & stock validation
//!
//! Everything here runs before the unit of work; a rejected request
//! writes nothing. The stock check is a fast pre-check only, the guarded
//! decrement in the reservation step is authoritative.

use super::CheckoutRequest;
use crate::pricing::{PricedLine, price_line};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_CHECKOUT_LINES, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_email,
    validate_quantity, validate_required_text,
};
use shared::error::{AppError, AppResult};
use shared::models::Product;
use shared::order::{PaymentMethod, ShippingAddress};
use std::collections::HashMap;

/// Request after shape validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// (product_id, quantity), duplicates merged, in first-seen order
    pub lines: Vec<(i64, i64)>,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingAddress,
    pub contact_email: Option<String>,
    pub use_member_price: bool,
}

fn validate_address(address: &ShippingAddress) -> AppResult<()> {
    validate_required_text(&address.recipient_name, "shipping_address.recipient_name", MAX_NAME_LEN)?;
    validate_required_text(&address.phone, "shipping_address.phone", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&address.address_line, "shipping_address.address_line", MAX_ADDRESS_LEN)?;
    validate_required_text(&address.city, "shipping_address.city", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&address.province, "shipping_address.province", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&address.postal_code, "shipping_address.postal_code", MAX_SHORT_TEXT_LEN)?;
    Ok(())
}

/// Shape checks: non-empty item list, quantities, address, method
pub fn validate_request(req: &CheckoutRequest) -> AppResult<ValidatedRequest> {
    if req.items.is_empty() {
        return Err(AppError::new(shared::error::ErrorCode::OrderEmpty));
    }

    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(req.items.len());
    let mut index: HashMap<i64, usize> = HashMap::new();
    for item in &req.items {
        validate_quantity(item.quantity, "quantity")?;
        match index.get(&item.product_id) {
            Some(&i) => merged[i].1 += item.quantity,
            None => {
                index.insert(item.product_id, merged.len());
                merged.push((item.product_id, item.quantity));
            }
        }
    }
    for (_, qty) in &merged {
        validate_quantity(*qty, "quantity")?;
    }
    if merged.len() > MAX_CHECKOUT_LINES {
        return Err(AppError::validation(format!(
            "too many products in one checkout (max {MAX_CHECKOUT_LINES})"
        ))
        .with_detail("field", "items"));
    }

    validate_address(&req.shipping_address)?;

    let contact_email = match req.contact_email.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(email) => {
            validate_email(email, "contact_email")?;
            Some(email.to_string())
        }
    };

    let payment_method: PaymentMethod = req.payment_method.parse().map_err(|e| {
        AppError::with_message(shared::error::ErrorCode::PaymentInvalidMethod, format!("{e}"))
            .with_detail("field", "payment_method")
    })?;

    Ok(ValidatedRequest {
        lines: merged,
        payment_method,
        shipping: req.shipping_address.clone(),
        contact_email,
        use_member_price: req.use_member_price,
    })
}

/// Check catalog state and price every line.
///
/// Any failing line rejects the whole request.
pub fn price_lines(
    lines: &[(i64, i64)],
    products: &[Product],
    now: i64,
    member_pricing: bool,
) -> AppResult<Vec<PricedLine>> {
    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();
    lines
        .iter()
        .map(|&(product_id, quantity)| {
            let product = by_id.get(&product_id).ok_or_else(|| {
                AppError::validation(format!("product {product_id} not found"))
                    .with_detail("product_id", product_id)
            })?;
            if !product.is_active {
                return Err(AppError::validation(format!("product {product_id} is not available"))
                    .with_detail("product_id", product_id));
            }
            if quantity > product.stock {
                return Err(AppError::out_of_stock(product_id, quantity, Some(product.stock)));
            }
            Ok(price_line(product, quantity, now, member_pricing))
        })
        .collect()
}

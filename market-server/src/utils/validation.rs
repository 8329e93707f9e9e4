//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement.

use shared::error::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Recipient names
pub const MAX_NAME_LEN: usize = 200;

/// Phone numbers, postal codes, province/city names
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Street addresses
pub const MAX_ADDRESS_LEN: usize = 500;

/// Max distinct products in one checkout
pub const MAX_CHECKOUT_LINES: usize = 50;

/// Max units of a single product in one checkout
pub const MAX_LINE_QUANTITY: i64 = 1_000;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")).with_detail("field", field));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Minimal shape check, delivery problems surface in the notification log.
pub fn validate_email(value: &str, field: &str) -> Result<(), AppError> {
    validate_required_text(value, field, MAX_EMAIL_LEN)?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::validation(format!("{field} is not a valid email address"))
            .with_detail("field", field));
    }
    Ok(())
}

/// Validate a line quantity: `1..=MAX_LINE_QUANTITY`
pub fn validate_quantity(quantity: i64, field: &str) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::validation(format!("{field} must be at least 1")).with_detail("field", field));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::validation(format!(
            "{field} exceeds the per-order limit of {MAX_LINE_QUANTITY}"
        ))
        .with_detail("field", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank_and_long() {
        assert!(validate_required_text("Jl. Merdeka 1", "address_line", MAX_ADDRESS_LEN).is_ok());
        assert!(validate_required_text("   ", "address_line", MAX_ADDRESS_LEN).is_err());
        let long = "x".repeat(MAX_SHORT_TEXT_LEN + 1);
        assert!(validate_required_text(&long, "city", MAX_SHORT_TEXT_LEN).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("siti@koperasi.id", "email").is_ok());
        assert!(validate_email("siti", "email").is_err());
        assert!(validate_email("@koperasi.id", "email").is_err());
        assert!(validate_email("siti@localhost", "email").is_err());
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1, "quantity").is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY, "quantity").is_ok());
        assert!(validate_quantity(0, "quantity").is_err());
        assert!(validate_quantity(-3, "quantity").is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1, "quantity").is_err());
    }
}

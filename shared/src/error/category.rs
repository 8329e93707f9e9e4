use serde::{Deserialize, Serialize};

/// 错误归属的业务领域
///
/// Assigned per code in the code table. `System` errors are logged when
/// they are turned into a response; the rest are expected client outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Buyer,
    Order,
    Payment,
    Stock,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn codes_carry_their_domain() {
        assert_eq!(ErrorCode::NotAuthenticated.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCode::BuyerNotFound.category(), ErrorCategory::Buyer);
        assert_eq!(ErrorCode::OrderIllegalTransition.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::PaymentSignatureInvalid.category(), ErrorCategory::Payment);
        assert_eq!(ErrorCode::ProductOutOfStock.category(), ErrorCategory::Stock);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ErrorCategory::Stock).unwrap(), "\"stock\"");
    }
}

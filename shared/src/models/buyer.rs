//! Buyer Model

use serde::{Deserialize, Serialize};

/// Cooperative membership status (会员状态)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MembershipStatus {
    /// Registered buyer, not a cooperative member
    Guest,
    /// Membership application under review
    Pending,
    Active,
    /// Active member whose KYC has been verified
    Verified,
    Suspended,
}

impl MembershipStatus {
    /// Members in good standing get member pricing
    pub fn is_eligible_for_member_price(&self) -> bool {
        matches!(self, Self::Active | Self::Verified)
    }
}

/// Buyer account, read-only to this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Buyer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub membership_status: MembershipStatus,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_price_eligibility() {
        assert!(MembershipStatus::Active.is_eligible_for_member_price());
        assert!(MembershipStatus::Verified.is_eligible_for_member_price());
        assert!(!MembershipStatus::Pending.is_eligible_for_member_price());
        assert!(!MembershipStatus::Suspended.is_eligible_for_member_price());
        assert!(!MembershipStatus::Guest.is_eligible_for_member_price());
    }

    #[test]
    fn membership_status_serde() {
        let json = serde_json::to_string(&MembershipStatus::Verified).unwrap();
        assert_eq!(json, "\"VERIFIED\"");
    }
}

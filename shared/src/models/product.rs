//! Product Model

use serde::{Deserialize, Serialize};

/// Catalog product (商品) with its stock counter.
///
/// All money fields are integer minor units (rupiah). `stock` is only ever
/// changed through market-server's stock reservation module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    /// Price for active cooperative members, if the product offers one
    pub member_price: Option<i64>,
    pub flash_sale_price: Option<i64>,
    /// Flash sale window, `[start, end)` in Unix millis
    pub flash_sale_start: Option<i64>,
    pub flash_sale_end: Option<i64>,
    pub stock: i64,
    /// Analytics counter, not authoritative
    pub sold_count: i64,
    pub weight_grams: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Flash sale price if `now` falls inside the sale window
    pub fn active_flash_price(&self, now: i64) -> Option<i64> {
        match (self.flash_sale_price, self.flash_sale_start, self.flash_sale_end) {
            (Some(price), Some(start), Some(end)) if start <= now && now < end => Some(price),
            _ => None,
        }
    }
}

/// Create product payload (catalog seeding and tests)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: i64,
    pub member_price: Option<i64>,
    pub flash_sale_price: Option<i64>,
    pub flash_sale_start: Option<i64>,
    pub flash_sale_end: Option<i64>,
    pub stock: i64,
    pub weight_grams: i64,
}

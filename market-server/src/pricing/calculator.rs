//! Checkout Price Calculator
//!
//! Pure functions: unit price resolution, fees and the final cost breakdown.
//! All amounts are integer rupiah.

use super::shipping;
use crate::core::config::PricingConfig;
use shared::models::Product;
use shared::order::{OrderCosts, PaymentMethod};

/// Which price won for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    FlashSale,
    Member,
    Base,
}

/// A priced line, ready to be snapshotted as an order line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub product_name: String,
    pub base_price: i64,
    pub unit_price: i64,
    pub source: PriceSource,
    pub weight_grams: i64,
    pub quantity: i64,
}

impl PricedLine {
    /// Amount charged for this line
    pub fn subtotal(&self) -> i64 {
        self.unit_price * self.quantity
    }

    pub fn base_subtotal(&self) -> i64 {
        self.base_price * self.quantity
    }

    pub fn discount(&self) -> i64 {
        (self.base_price - self.unit_price) * self.quantity
    }
}

/// Resolve the unit price: flash sale, then member price, then base price
pub fn resolve_unit_price(product: &Product, now: i64, member_pricing: bool) -> (i64, PriceSource) {
    if let Some(price) = product.active_flash_price(now) {
        return (price, PriceSource::FlashSale);
    }
    if member_pricing && let Some(price) = product.member_price {
        return (price, PriceSource::Member);
    }
    (product.price, PriceSource::Base)
}

pub fn price_line(product: &Product, quantity: i64, now: i64, member_pricing: bool) -> PricedLine {
    let (unit_price, source) = resolve_unit_price(product, now, member_pricing);
    PricedLine {
        product_id: product.id,
        product_name: product.name.clone(),
        base_price: product.price,
        unit_price,
        source,
        weight_grams: product.weight_grams,
        quantity,
    }
}

/// Service fee, waived once the discounted subtotal reaches the threshold
pub fn service_fee(subtotal: i64, discount: i64, config: &PricingConfig) -> i64 {
    if subtotal - discount >= config.service_fee_waiver_threshold {
        0
    } else {
        config.service_fee
    }
}

/// Gateway fee schedule per payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodFee {
    pub flat: i64,
    /// Percentage in basis points of the amount before the fee
    pub basis_points: i64,
}

pub fn method_fee_schedule(method: PaymentMethod) -> MethodFee {
    match method {
        PaymentMethod::BankTransfer | PaymentMethod::Echannel => MethodFee { flat: 4_000, basis_points: 0 },
        PaymentMethod::Cstore => MethodFee { flat: 5_000, basis_points: 0 },
        PaymentMethod::Gopay | PaymentMethod::Shopeepay => MethodFee { flat: 0, basis_points: 200 },
        PaymentMethod::Qris => MethodFee { flat: 0, basis_points: 70 },
        PaymentMethod::CreditCard => MethodFee { flat: 2_000, basis_points: 290 },
    }
}

/// Payment fee on `amount`, percentage part rounded up to whole rupiah
pub fn payment_fee(method: PaymentMethod, amount: i64) -> i64 {
    let schedule = method_fee_schedule(method);
    let percent = (amount.max(0) * schedule.basis_points + 9_999) / 10_000;
    schedule.flat + percent
}

/// Full price quote for a checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub weight_grams: i64,
    pub costs: OrderCosts,
}

/// Price the given lines for delivery to `province`, paying with `method`
pub fn quote(
    lines: Vec<PricedLine>,
    province: &str,
    method: PaymentMethod,
    config: &PricingConfig,
) -> Quote {
    let subtotal: i64 = lines.iter().map(PricedLine::base_subtotal).sum();
    let discount: i64 = lines.iter().map(PricedLine::discount).sum();
    let weight_grams: i64 = lines.iter().map(|l| l.weight_grams * l.quantity).sum();

    let shipping = shipping::shipping_cost(province, weight_grams);
    let service = service_fee(subtotal, discount, config);
    let method_fee = payment_fee(method, subtotal - discount + shipping + service);

    Quote {
        lines,
        weight_grams,
        costs: OrderCosts::new(subtotal, discount, shipping, service, method_fee),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64) -> Product {
        Product {
            id: 1,
            name: "Keripik Singkong".into(),
            price,
            member_price: None,
            flash_sale_price: None,
            flash_sale_start: None,
            flash_sale_end: None,
            stock: 10,
            sold_count: 0,
            weight_grams: 400,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn flash_sale_beats_member_price() {
        let mut p = product(50_000);
        p.member_price = Some(45_000);
        p.flash_sale_price = Some(40_000);
        p.flash_sale_start = Some(100);
        p.flash_sale_end = Some(200);

        assert_eq!(resolve_unit_price(&p, 150, true), (40_000, PriceSource::FlashSale));
        assert_eq!(resolve_unit_price(&p, 250, true), (45_000, PriceSource::Member));
        assert_eq!(resolve_unit_price(&p, 250, false), (50_000, PriceSource::Base));
    }

    #[test]
    fn member_price_needs_a_price() {
        let p = product(50_000);
        assert_eq!(resolve_unit_price(&p, 0, true), (50_000, PriceSource::Base));
    }

    #[test]
    fn service_fee_waiver() {
        let cfg = PricingConfig::default();
        assert_eq!(service_fee(100_000, 0, &cfg), 0);
        assert_eq!(service_fee(100_000, 1, &cfg), 2_000);
        assert_eq!(service_fee(99_999, 0, &cfg), 2_000);
    }

    #[test]
    fn payment_fee_rounds_up() {
        assert_eq!(payment_fee(PaymentMethod::BankTransfer, 110_000), 4_000);
        assert_eq!(payment_fee(PaymentMethod::Gopay, 110_000), 2_200);
        // 0.7% of 10_001 = 70.007 -> 71
        assert_eq!(payment_fee(PaymentMethod::Qris, 10_001), 71);
        assert_eq!(payment_fee(PaymentMethod::CreditCard, 100_000), 4_900);
    }

    #[test]
    fn two_units_to_java() {
        let line = price_line(&product(50_000), 2, 0, false);
        let q = quote(vec![line], "Jawa Barat", PaymentMethod::BankTransfer, &PricingConfig::default());
        assert_eq!(q.weight_grams, 800);
        assert_eq!(q.costs.subtotal, 100_000);
        assert_eq!(q.costs.discount, 0);
        assert_eq!(q.costs.shipping, 10_000);
        assert_eq!(q.costs.service_fee, 0);
        assert_eq!(q.costs.payment_fee, 4_000);
        assert_eq!(q.costs.total, 114_000);
    }

    #[test]
    fn total_invariant_across_combinations() {
        let cfg = PricingConfig::default();
        let provinces = ["Bali", "Aceh", "Kalimantan Barat", "Sulawesi Selatan", "Papua"];
        for method in PaymentMethod::ALL {
            for province in provinces {
                for member in [false, true] {
                    for qty in [1, 3, 17] {
                        let mut p = product(33_333);
                        p.member_price = Some(29_999);
                        let line = price_line(&p, qty, 0, member);
                        let q = quote(vec![line], province, method, &cfg);
                        assert!(q.costs.is_consistent());
                        assert!(q.costs.total > 0);
                        if member {
                            assert_eq!(q.costs.discount, 3_334 * qty);
                        }
                    }
                }
            }
        }
    }
}

//! Shipping Tariff
//!
//! Flat regional tariff: the destination province selects a region, the
//! parcel weight is rounded up to whole kilograms (minimum 1 kg).

/// Delivery region (配送区域)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Java, Bali, Jakarta metro
    Jawa,
    Sumatera,
    Kalimantan,
    /// Sulawesi and Nusa Tenggara
    Sulawesi,
    /// Maluku, Papua and anything unrecognised
    Remote,
}

/// Per-region rates in rupiah
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tariff {
    pub first_kg: i64,
    pub next_kg: i64,
}

const JAWA_PROVINCES: &[&str] = &[
    "dki jakarta",
    "jakarta",
    "jawa barat",
    "jawa tengah",
    "jawa timur",
    "di yogyakarta",
    "yogyakarta",
    "banten",
    "bali",
];

const SUMATERA_PROVINCES: &[&str] = &[
    "aceh",
    "sumatera utara",
    "sumatera barat",
    "sumatera selatan",
    "riau",
    "kepulauan riau",
    "jambi",
    "bengkulu",
    "lampung",
    "kepulauan bangka belitung",
];

const KALIMANTAN_PROVINCES: &[&str] = &[
    "kalimantan barat",
    "kalimantan tengah",
    "kalimantan selatan",
    "kalimantan timur",
    "kalimantan utara",
];

const SULAWESI_PROVINCES: &[&str] = &[
    "sulawesi utara",
    "sulawesi tengah",
    "sulawesi selatan",
    "sulawesi tenggara",
    "sulawesi barat",
    "gorontalo",
    "nusa tenggara barat",
    "nusa tenggara timur",
];

impl Region {
    /// Resolve from a free-text province name (case and spacing insensitive)
    pub fn from_province(province: &str) -> Self {
        let normalized = province
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let name = normalized.as_str();
        if JAWA_PROVINCES.contains(&name) {
            Region::Jawa
        } else if SUMATERA_PROVINCES.contains(&name) {
            Region::Sumatera
        } else if KALIMANTAN_PROVINCES.contains(&name) {
            Region::Kalimantan
        } else if SULAWESI_PROVINCES.contains(&name) {
            Region::Sulawesi
        } else {
            Region::Remote
        }
    }

    pub fn tariff(&self) -> Tariff {
        match self {
            Region::Jawa => Tariff { first_kg: 10_000, next_kg: 6_000 },
            Region::Sumatera => Tariff { first_kg: 15_000, next_kg: 9_000 },
            Region::Kalimantan => Tariff { first_kg: 20_000, next_kg: 12_000 },
            Region::Sulawesi => Tariff { first_kg: 22_000, next_kg: 14_000 },
            Region::Remote => Tariff { first_kg: 35_000, next_kg: 25_000 },
        }
    }
}

/// Billable kilograms: ceil(grams / 1000), at least 1
pub fn billable_kg(weight_grams: i64) -> i64 {
    let kg = (weight_grams.max(0) + 999) / 1000;
    kg.max(1)
}

/// Shipping cost for a parcel of `weight_grams` to `province`
pub fn shipping_cost(province: &str, weight_grams: i64) -> i64 {
    let tariff = Region::from_province(province).tariff();
    tariff.first_kg + (billable_kg(weight_grams) - 1) * tariff.next_kg
}

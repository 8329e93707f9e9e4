//! Order reference generator: `ORD-YYYYMMDD-XXXXXX`

use chrono::{DateTime, Utc};
use rand::Rng;

/// No 0/O, 1/I/L: references get read out over the phone
const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 6;

pub fn generate_reference(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("ORD-{}-{suffix}", now.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reference_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        let r = generate_reference(now);
        assert_eq!(r.len(), "ORD-20261016-".len() + SUFFIX_LEN);
        assert!(r.starts_with("ORD-20261016-"));
        assert!(r[13..].bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn references_vary() {
        let now = Utc::now();
        let refs: std::collections::HashSet<_> = (0..100).map(|_| generate_reference(now)).collect();
        assert!(refs.len() > 90);
    }
}

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU16, Ordering};

/// 当前 UTC 毫秒时间戳
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 2025-01-01T00:00:00Z
const ID_EPOCH_MS: i64 = 1_735_689_600_000;
const SEQ_BITS: u32 = 12;
const SEQ_MASK: u16 = (1 << SEQ_BITS) - 1;

/// 53 位 ID: 41 位毫秒 + 12 位序号，可安全放进 JS Number
///
/// The sequence starts at a random offset per process and wraps, so two ids
/// minted in the same millisecond by one process never collide unless more
/// than 4096 are taken. Order, line item, event and notification rows all
/// use it.
pub fn snowflake_id() -> i64 {
    static SEQ: OnceLock<AtomicU16> = OnceLock::new();
    let seq = SEQ
        .get_or_init(|| AtomicU16::new(rand::random::<u16>()))
        .fetch_add(1, Ordering::Relaxed)
        & SEQ_MASK;
    let elapsed = (now_millis() - ID_EPOCH_MS) & ((1 << 41) - 1);
    (elapsed << SEQ_BITS) | i64::from(seq)
}

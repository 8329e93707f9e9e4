//! Message templates (Bahasa Indonesia)

use super::NotificationMessage;
use shared::models::NotificationKind;
use shared::order::Order;

/// `114000` -> `Rp114.000`
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp{grouped}")
    } else {
        format!("Rp{grouped}")
    }
}

pub fn render(kind: NotificationKind, order: &Order) -> NotificationMessage {
    let name = &order.shipping.recipient_name;
    let reference = &order.reference;
    let total = format_rupiah(order.total);
    match kind {
        NotificationKind::PaymentReceived => NotificationMessage {
            subject: format!("Pembayaran diterima - {reference}"),
            body: format!(
                "Halo {name}, pembayaran {total} untuk pesanan {reference} sudah kami terima. \
                 Pesanan akan segera diproses oleh koperasi."
            ),
        },
        NotificationKind::PaymentFailed => NotificationMessage {
            subject: format!("Pembayaran gagal - {reference}"),
            body: format!(
                "Halo {name}, pembayaran untuk pesanan {reference} ({total}) gagal. \
                 Stok telah dikembalikan, silakan buat pesanan baru."
            ),
        },
        NotificationKind::OrderCancelled => NotificationMessage {
            subject: format!("Pesanan dibatalkan - {reference}"),
            body: format!(
                "Halo {name}, pesanan {reference} ({total}) telah dibatalkan dan tidak akan ditagih."
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0), "Rp0");
        assert_eq!(format_rupiah(999), "Rp999");
        assert_eq!(format_rupiah(1_000), "Rp1.000");
        assert_eq!(format_rupiah(114_000), "Rp114.000");
        assert_eq!(format_rupiah(1_234_567), "Rp1.234.567");
        assert_eq!(format_rupiah(-2_000), "-Rp2.000");
    }
}

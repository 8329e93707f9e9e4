//! Stock Reservation Repository
//!
//! The only writer of `product.stock`. Every decrement is a single guarded
//! statement, so two concurrent checkouts can never drive stock below zero.

use super::{RepoResult, Tx};

/// Conditionally take `quantity` units. Returns `false` when stock is insufficient.
pub async fn reserve(tx: &mut Tx<'_>, product_id: i64, quantity: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE product SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(shared::util::now_millis())
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Current stock, for error details after a failed reservation
pub async fn available(tx: &mut Tx<'_>, product_id: i64) -> RepoResult<Option<i64>> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM product WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(stock)
}

/// Give back every line item of an order, at most once per order.
///
/// Returns `false` when the order's stock was already restored.
pub async fn restore_for_order(tx: &mut Tx<'_>, order_id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let claimed = sqlx::query(
        "UPDATE orders SET stock_restored = 1, updated_at = ? WHERE id = ? AND stock_restored = 0",
    )
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    if claimed.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        "UPDATE product SET stock = stock + (SELECT COALESCE(SUM(oi.quantity), 0) FROM order_item oi WHERE oi.order_id = ?1 AND oi.product_id = product.id), updated_at = ?2 \
         WHERE id IN (SELECT product_id FROM order_item WHERE order_id = ?1)",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(true)
}

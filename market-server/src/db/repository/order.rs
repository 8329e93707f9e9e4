//! Order Ledger Repository
//!
//! Orders and their line item snapshots. Status writes are guarded on the
//! expected current status so a stale reader can never overwrite a newer state.

use super::{RepoResult, Tx};
use shared::order::{
    Order, OrderCosts, OrderDetail, OrderLineItem, OrderStatus, PaymentMethod, ShippingAddress,
};
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT id, reference, buyer_id, status, payment_status, subtotal, discount, shipping_cost, service_fee, payment_fee, total, recipient_name, phone, address_line, city, province, postal_code, contact_email, payment_method, payment_token, payment_url, gateway_txn_id, stock_restored, paid_at, created_at, updated_at FROM orders";

const ITEM_SELECT: &str = "SELECT id, order_id, product_id, product_name, base_price, unit_price, weight_grams, quantity, subtotal FROM order_item";

/// Data for a new PENDING order
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub id: i64,
    pub reference: &'a str,
    pub buyer_id: i64,
    pub costs: OrderCosts,
    pub shipping: &'a ShippingAddress,
    pub contact_email: Option<&'a str>,
    pub payment_method: PaymentMethod,
    pub created_at: i64,
}

/// Insert the order header. A `Duplicate` error means the reference is taken.
pub async fn insert(tx: &mut Tx<'_>, order: &NewOrder<'_>) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, reference, buyer_id, status, payment_status, subtotal, discount, shipping_cost, service_fee, payment_fee, total, recipient_name, phone, address_line, city, province, postal_code, contact_email, payment_method, stock_restored, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 'PENDING', 'PENDING', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, 0, ?18, ?18)",
    )
    .bind(order.id)
    .bind(order.reference)
    .bind(order.buyer_id)
    .bind(order.costs.subtotal)
    .bind(order.costs.discount)
    .bind(order.costs.shipping)
    .bind(order.costs.service_fee)
    .bind(order.costs.payment_fee)
    .bind(order.costs.total)
    .bind(&order.shipping.recipient_name)
    .bind(&order.shipping.phone)
    .bind(&order.shipping.address_line)
    .bind(&order.shipping.city)
    .bind(&order.shipping.province)
    .bind(&order.shipping.postal_code)
    .bind(order.contact_email)
    .bind(order.payment_method)
    .bind(order.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_item(tx: &mut Tx<'_>, item: &OrderLineItem) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_item (id, order_id, product_id, product_name, base_price, unit_price, weight_grams, quantity, subtotal) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.base_price)
    .bind(item.unit_price)
    .bind(item.weight_grams)
    .bind(item.quantity)
    .bind(item.subtotal)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn find_by_reference(pool: &SqlitePool, reference: &str) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE reference = ?");
    Ok(sqlx::query_as::<_, Order>(&sql)
        .bind(reference)
        .fetch_optional(pool)
        .await?)
}

/// Read inside a unit of work, after its first write
pub async fn find_by_reference_tx(tx: &mut Tx<'_>, reference: &str) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE reference = ?");
    Ok(sqlx::query_as::<_, Order>(&sql)
        .bind(reference)
        .fetch_optional(&mut **tx)
        .await?)
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderLineItem>> {
    let sql = format!("{ITEM_SELECT} WHERE order_id = ? ORDER BY id");
    Ok(sqlx::query_as::<_, OrderLineItem>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?)
}

pub async fn find_detail(pool: &SqlitePool, reference: &str) -> RepoResult<Option<OrderDetail>> {
    let Some(order) = find_by_reference(pool, reference).await? else {
        return Ok(None);
    };
    let items = find_items(pool, order.id).await?;
    Ok(Some(OrderDetail { order, items }))
}

/// Store the gateway handle; only a still-PENDING order accepts one.
pub async fn attach_payment_handle(
    pool: &SqlitePool,
    order_id: i64,
    token: &str,
    redirect_url: &str,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_token = ?, payment_url = ?, updated_at = ? WHERE id = ? AND status = 'PENDING'",
    )
    .bind(token)
    .bind(redirect_url)
    .bind(shared::util::now_millis())
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Compare-and-set the order status. Returns `false` if the order is no longer in `from`.
pub async fn transition(
    tx: &mut Tx<'_>,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    gateway_txn_id: Option<&str>,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let paid_at = (to == OrderStatus::Paid).then_some(now);
    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, payment_status = ?2, gateway_txn_id = COALESCE(?3, gateway_txn_id), paid_at = COALESCE(?4, paid_at), updated_at = ?5 \
         WHERE id = ?6 AND status = ?7",
    )
    .bind(to)
    .bind(to.payment_status())
    .bind(gateway_txn_id)
    .bind(paid_at)
    .bind(now)
    .bind(order_id)
    .bind(from)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Take the write lock on an order that may still be cancelled by the buyer:
/// PENDING, payment PENDING and no payment handle. Returns `false` otherwise.
pub async fn lock_cancellable(tx: &mut Tx<'_>, order_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET updated_at = ? WHERE id = ? AND status = 'PENDING' AND payment_status = 'PENDING' AND payment_token IS NULL",
    )
    .bind(shared::util::now_millis())
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// PENDING orders that never received a payment handle and are older than `cutoff`
pub async fn find_stale_pending(
    pool: &SqlitePool,
    cutoff: i64,
    limit: i64,
) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{ORDER_SELECT} WHERE status = 'PENDING' AND payment_token IS NULL AND created_at < ? ORDER BY created_at LIMIT ?"
    );
    Ok(sqlx::query_as::<_, Order>(&sql)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

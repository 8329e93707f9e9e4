//! Payment Event Repository
//!
//! Append-only log of authenticated gateway callbacks. The unique key
//! `(transaction_id, transaction_status)` is the idempotency guard.

use super::{RepoResult, Tx};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentEvent {
    pub id: i64,
    pub transaction_id: String,
    pub transaction_status: String,
    pub order_reference: String,
    pub outcome: String,
    pub raw_payload: String,
    pub processed_at: i64,
}

/// Record a callback. Returns `false` if this exact event was already recorded.
///
/// INSERT first and check rows_affected, never SELECT-then-INSERT.
pub async fn insert_if_new(
    tx: &mut Tx<'_>,
    transaction_id: &str,
    transaction_status: &str,
    order_reference: &str,
    raw_payload: &str,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "INSERT INTO payment_event (id, transaction_id, transaction_status, order_reference, outcome, raw_payload, processed_at) \
         VALUES (?, ?, ?, ?, 'RECEIVED', ?, ?) ON CONFLICT (transaction_id, transaction_status) DO NOTHING",
    )
    .bind(shared::util::snowflake_id())
    .bind(transaction_id)
    .bind(transaction_status)
    .bind(order_reference)
    .bind(raw_payload)
    .bind(shared::util::now_millis())
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() == 1)
}

pub async fn set_outcome(
    tx: &mut Tx<'_>,
    transaction_id: &str,
    transaction_status: &str,
    outcome: &str,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE payment_event SET outcome = ? WHERE transaction_id = ? AND transaction_status = ?",
    )
    .bind(outcome)
    .bind(transaction_id)
    .bind(transaction_status)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find_by_reference(
    pool: &SqlitePool,
    order_reference: &str,
) -> RepoResult<Vec<PaymentEvent>> {
    Ok(sqlx::query_as::<_, PaymentEvent>(
        "SELECT id, transaction_id, transaction_status, order_reference, outcome, raw_payload, processed_at FROM payment_event WHERE order_reference = ? ORDER BY processed_at, id",
    )
    .bind(order_reference)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn second_insert_is_rejected() {
        let db = DbService::open_in_memory().await.unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        assert!(insert_if_new(&mut tx, "txn-1", "settlement", "ORD-1", "{}").await.unwrap());
        assert!(!insert_if_new(&mut tx, "txn-1", "settlement", "ORD-1", "{}").await.unwrap());
        // Same transaction, different status is a new event
        assert!(insert_if_new(&mut tx, "txn-1", "expire", "ORD-1", "{}").await.unwrap());
        set_outcome(&mut tx, "txn-1", "settlement", "APPLIED").await.unwrap();
        tx.commit().await.unwrap();

        let events = find_by_reference(&db.pool, "ORD-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.outcome == "APPLIED"));
    }
}

//! Notification Queue Repository
//!
//! One `notification_task` per (order, kind) plus one `notification_delivery`
//! per channel. Lower `priority` goes first; a higher-priority delivery only
//! becomes due once every lower one for the same task has FAILED.

use super::{RepoResult, Tx};
use shared::models::{
    ChannelKind, NotificationDelivery, NotificationKind, NotificationStatus, NotificationTask,
};
use sqlx::SqlitePool;

/// A channel target to create alongside a task
#[derive(Debug, Clone)]
pub struct DeliveryTarget {
    pub channel: ChannelKind,
    pub target: String,
}

/// A delivery that is ready to be attempted, joined with its task
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueDelivery {
    pub delivery_id: i64,
    pub task_id: i64,
    pub order_id: i64,
    pub kind: NotificationKind,
    pub payload: String,
    pub channel: ChannelKind,
    pub target: String,
    pub attempts: i64,
    pub next_attempt_at: i64,
}

/// Queue counts for the health endpoint
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct QueueCounts {
    pub queued: i64,
    pub sent: i64,
    pub failed: i64,
}

/// Create the task and its deliveries, in `targets` order (first = primary).
///
/// Returns `None` when a task for this (order, kind) already exists.
pub async fn enqueue(
    tx: &mut Tx<'_>,
    order_id: i64,
    kind: NotificationKind,
    payload: &str,
    targets: &[DeliveryTarget],
) -> RepoResult<Option<i64>> {
    let now = shared::util::now_millis();
    let task_id = shared::util::snowflake_id();
    // No reachable channel: record the task as already failed
    let status = if targets.is_empty() {
        NotificationStatus::Failed
    } else {
        NotificationStatus::Queued
    };

    let rows = sqlx::query(
        "INSERT INTO notification_task (id, order_id, kind, payload, status, attempts, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6) ON CONFLICT (order_id, kind) DO NOTHING",
    )
    .bind(task_id)
    .bind(order_id)
    .bind(kind)
    .bind(payload)
    .bind(status)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Ok(None);
    }

    for (priority, target) in targets.iter().enumerate() {
        sqlx::query(
            "INSERT INTO notification_delivery (id, task_id, channel, priority, target, status, attempts, next_attempt_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'QUEUED', 0, ?6, ?6)",
        )
        .bind(shared::util::snowflake_id())
        .bind(task_id)
        .bind(target.channel)
        .bind(priority as i64)
        .bind(&target.target)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }
    Ok(Some(task_id))
}

/// Deliveries whose backoff has elapsed and whose lower-priority siblings all failed
pub async fn find_due(pool: &SqlitePool, now: i64, limit: i64) -> RepoResult<Vec<DueDelivery>> {
    Ok(sqlx::query_as::<_, DueDelivery>(
        "SELECT d.id AS delivery_id, d.task_id, t.order_id, t.kind, t.payload, d.channel, d.target, d.attempts, d.next_attempt_at \
         FROM notification_delivery d JOIN notification_task t ON t.id = d.task_id \
         WHERE d.status = 'QUEUED' AND t.status = 'QUEUED' AND d.next_attempt_at <= ?1 \
           AND NOT EXISTS (SELECT 1 FROM notification_delivery p WHERE p.task_id = d.task_id AND p.priority < d.priority AND p.status <> 'FAILED') \
         ORDER BY d.next_attempt_at LIMIT ?2",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// Lease a due delivery until `lease_until`. Only one claimer wins.
pub async fn claim(
    pool: &SqlitePool,
    delivery_id: i64,
    seen_next_attempt_at: i64,
    lease_until: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE notification_delivery SET next_attempt_at = ? WHERE id = ? AND status = 'QUEUED' AND next_attempt_at = ?",
    )
    .bind(lease_until)
    .bind(delivery_id)
    .bind(seen_next_attempt_at)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Delivery succeeded: the task is done
pub async fn mark_sent(pool: &SqlitePool, delivery_id: i64, task_id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE notification_delivery SET status = 'SENT', attempts = attempts + 1, last_error = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(delivery_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "UPDATE notification_task SET status = 'SENT', attempts = attempts + 1, updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

/// Attempt failed, try this channel again at `next_attempt_at`
pub async fn mark_retry(
    pool: &SqlitePool,
    delivery_id: i64,
    task_id: i64,
    next_attempt_at: i64,
    error: &str,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE notification_delivery SET attempts = attempts + 1, last_error = ?, next_attempt_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error)
    .bind(next_attempt_at)
    .bind(now)
    .bind(delivery_id)
    .execute(&mut *tx)
    .await?;
    bump_task_attempts(&mut tx, task_id, now).await?;
    tx.commit().await?;
    Ok(())
}

/// Channel exhausted. Settles the task as FAILED when no channel is left.
///
/// Returns `true` if the whole task is now FAILED.
pub async fn mark_failed(
    pool: &SqlitePool,
    delivery_id: i64,
    task_id: i64,
    error: &str,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE notification_delivery SET status = 'FAILED', attempts = attempts + 1, last_error = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error)
    .bind(now)
    .bind(delivery_id)
    .execute(&mut *tx)
    .await?;
    bump_task_attempts(&mut tx, task_id, now).await?;
    let settled = sqlx::query(
        "UPDATE notification_task SET status = 'FAILED', updated_at = ?1 WHERE id = ?2 AND status = 'QUEUED' \
         AND NOT EXISTS (SELECT 1 FROM notification_delivery WHERE task_id = ?2 AND status = 'QUEUED')",
    )
    .bind(now)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(settled.rows_affected() == 1)
}

async fn bump_task_attempts(tx: &mut Tx<'_>, task_id: i64, now: i64) -> RepoResult<()> {
    sqlx::query("UPDATE notification_task SET attempts = attempts + 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(task_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn find_tasks_by_order(
    pool: &SqlitePool,
    order_id: i64,
) -> RepoResult<Vec<NotificationTask>> {
    Ok(sqlx::query_as::<_, NotificationTask>(
        "SELECT id, order_id, kind, payload, status, attempts, created_at, updated_at FROM notification_task WHERE order_id = ? ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?)
}

pub async fn find_deliveries(
    pool: &SqlitePool,
    task_id: i64,
) -> RepoResult<Vec<NotificationDelivery>> {
    Ok(sqlx::query_as::<_, NotificationDelivery>(
        "SELECT id, task_id, channel, priority, target, status, attempts, last_error, next_attempt_at, updated_at FROM notification_delivery WHERE task_id = ? ORDER BY priority",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?)
}

pub async fn count_by_status(pool: &SqlitePool) -> RepoResult<QueueCounts> {
    let rows: Vec<(NotificationStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM notification_task GROUP BY status")
            .fetch_all(pool)
            .await?;
    let mut counts = QueueCounts::default();
    for (status, n) in rows {
        match status {
            NotificationStatus::Queued => counts.queued = n,
            NotificationStatus::Sent => counts.sent = n,
            NotificationStatus::Failed => counts.failed = n,
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{buyer, order};
    use shared::models::MembershipStatus;
    use shared::order::{OrderCosts, PaymentMethod, ShippingAddress};

    async fn seed_order(db: &DbService) -> i64 {
        buyer::upsert(&db.pool, 1, "Ani", None, None, MembershipStatus::Guest)
            .await
            .unwrap();
        let shipping = ShippingAddress {
            recipient_name: "Ani".into(),
            phone: "+62812".into(),
            address_line: "Jl. Melati 9".into(),
            city: "Medan".into(),
            province: "Sumatera Utara".into(),
            postal_code: "20111".into(),
        };
        let id = shared::util::snowflake_id();
        let mut tx = db.pool.begin().await.unwrap();
        order::insert(
            &mut tx,
            &order::NewOrder {
                id,
                reference: "ORD-20261016-NOTIFY",
                buyer_id: 1,
                costs: OrderCosts::new(20_000, 0, 15_000, 2_000, 0),
                shipping: &shipping,
                contact_email: Some("ani@example.id"),
                payment_method: PaymentMethod::Qris,
                created_at: 1,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        id
    }

    fn targets() -> Vec<DeliveryTarget> {
        vec![
            DeliveryTarget {
                channel: ChannelKind::Whatsapp,
                target: "+62812".into(),
            },
            DeliveryTarget {
                channel: ChannelKind::Email,
                target: "ani@example.id".into(),
            },
        ]
    }

    #[tokio::test]
    async fn enqueue_once_per_kind() {
        let db = DbService::open_in_memory().await.unwrap();
        let order_id = seed_order(&db).await;

        let mut tx = db.pool.begin().await.unwrap();
        let first = enqueue(&mut tx, order_id, NotificationKind::PaymentReceived, "{}", &targets())
            .await
            .unwrap();
        let second = enqueue(&mut tx, order_id, NotificationKind::PaymentReceived, "{}", &targets())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(find_tasks_by_order(&db.pool, order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fallback_waits_for_primary_failure() {
        let db = DbService::open_in_memory().await.unwrap();
        let order_id = seed_order(&db).await;

        let mut tx = db.pool.begin().await.unwrap();
        let task_id = enqueue(&mut tx, order_id, NotificationKind::PaymentReceived, "{}", &targets())
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        let now = shared::util::now_millis() + 1;
        let due = find_due(&db.pool, now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].channel, ChannelKind::Whatsapp);

        let task_failed = mark_failed(&db.pool, due[0].delivery_id, task_id, "503").await.unwrap();
        assert!(!task_failed);

        let due = find_due(&db.pool, now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].channel, ChannelKind::Email);

        mark_sent(&db.pool, due[0].delivery_id, task_id).await.unwrap();
        let tasks = find_tasks_by_order(&db.pool, order_id).await.unwrap();
        assert_eq!(tasks[0].status, NotificationStatus::Sent);
        assert_eq!(tasks[0].attempts, 2);
        assert!(find_due(&db.pool, now, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let db = DbService::open_in_memory().await.unwrap();
        let order_id = seed_order(&db).await;

        let mut tx = db.pool.begin().await.unwrap();
        enqueue(&mut tx, order_id, NotificationKind::PaymentFailed, "{}", &targets()[..1])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let due = find_due(&db.pool, shared::util::now_millis() + 1, 10).await.unwrap();
        let d = &due[0];
        assert!(claim(&db.pool, d.delivery_id, d.next_attempt_at, d.next_attempt_at + 60_000).await.unwrap());
        assert!(!claim(&db.pool, d.delivery_id, d.next_attempt_at, d.next_attempt_at + 60_000).await.unwrap());
    }

    #[tokio::test]
    async fn last_channel_failure_fails_task() {
        let db = DbService::open_in_memory().await.unwrap();
        let order_id = seed_order(&db).await;

        let mut tx = db.pool.begin().await.unwrap();
        let task_id = enqueue(&mut tx, order_id, NotificationKind::OrderCancelled, "{}", &targets()[..1])
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        let due = find_due(&db.pool, shared::util::now_millis() + 1, 10).await.unwrap();
        assert!(mark_failed(&db.pool, due[0].delivery_id, task_id, "timeout").await.unwrap());

        let counts = count_by_status(&db.pool).await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.queued, 0);
    }
}

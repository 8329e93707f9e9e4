//! Buyer Repository
//!
//! Buyers are owned by the membership service; this side only reads them.

use super::RepoResult;
use shared::models::{Buyer, MembershipStatus};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Buyer>> {
    let row = sqlx::query_as::<_, Buyer>(
        "SELECT id, name, phone, email, membership_status, created_at FROM buyer WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// 测试用: 直接写入买家记录
#[cfg(test)]
pub(crate) async fn upsert(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    phone: Option<&str>,
    email: Option<&str>,
    membership_status: MembershipStatus,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO buyer (id, name, phone, email, membership_status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, phone = excluded.phone, email = excluded.email, membership_status = excluded.membership_status",
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .bind(email)
    .bind(membership_status)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

//! Product Repository

use super::RepoResult;
use shared::models::{Product, ProductCreate};
use sqlx::SqlitePool;

const PRODUCT_SELECT: &str = "SELECT id, name, price, member_price, flash_sale_price, flash_sale_start, flash_sale_end, stock, sold_count, weight_grams, is_active, created_at, updated_at FROM product";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Batch lookup; missing ids are simply absent from the result
pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("{PRODUCT_SELECT} WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO product (id, name, price, member_price, flash_sale_price, flash_sale_start, flash_sale_end, stock, sold_count, weight_grams, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, 1, ?10, ?10)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(data.price)
    .bind(data.member_price)
    .bind(data.flash_sale_price)
    .bind(data.flash_sale_start)
    .bind(data.flash_sale_end)
    .bind(data.stock)
    .bind(data.weight_grams)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| super::RepoError::Database("Failed to create product".into()))
}

/// Analytics counter, bumped after an order is paid
pub async fn add_sold_count(pool: &SqlitePool, product_id: i64, quantity: i64) -> RepoResult<()> {
    sqlx::query("UPDATE product SET sold_count = sold_count + ? WHERE id = ?")
        .bind(quantity)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn find_by_ids_skips_missing() {
        let db = DbService::open_in_memory().await.unwrap();
        let a = create(
            &db.pool,
            ProductCreate {
                name: "Beras Organik 5kg".into(),
                price: 85_000,
                stock: 10,
                weight_grams: 5_000,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let found = find_by_ids(&db.pool, &[a.id, 42]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Beras Organik 5kg");
        assert!(found[0].is_active);
        assert!(find_by_ids(&db.pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sold_count_accumulates() {
        let db = DbService::open_in_memory().await.unwrap();
        let p = create(
            &db.pool,
            ProductCreate {
                name: "Madu Hutan".into(),
                price: 60_000,
                stock: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        add_sold_count(&db.pool, p.id, 2).await.unwrap();
        add_sold_count(&db.pool, p.id, 1).await.unwrap();
        let p = find_by_id(&db.pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.sold_count, 3);
        assert_eq!(p.stock, 3);
    }
}

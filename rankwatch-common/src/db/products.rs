//! Tracked-product store
//!
//! Operator-managed set of identifiers the pipeline polls. Iteration order
//! is registration order, preserved by a monotonic position column.

use crate::types::TrackedProduct;
use crate::Result;
use sqlx::{Row, SqlitePool};

/// List tracked products in registration order
pub async fn list(pool: &SqlitePool) -> Result<Vec<TrackedProduct>> {
    let rows = sqlx::query(
        "SELECT asin, display_name FROM tracked_products ORDER BY position ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TrackedProduct {
            asin: row.get("asin"),
            display_name: row.get("display_name"),
        })
        .collect())
}

/// Insert or update a tracked product
///
/// A re-registered identifier keeps its original position; only the
/// display name is refreshed.
pub async fn upsert(pool: &SqlitePool, product: &TrackedProduct) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tracked_products (asin, display_name, position)
        VALUES (?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM tracked_products))
        ON CONFLICT(asin) DO UPDATE SET
            display_name = excluded.display_name,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&product.asin)
    .bind(&product.display_name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the display name with the provider title after a successful
/// resolution
pub async fn update_title(pool: &SqlitePool, asin: &str, title: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tracked_products
        SET display_name = ?, updated_at = CURRENT_TIMESTAMP
        WHERE asin = ?
        "#,
    )
    .bind(title)
    .bind(asin)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a product from the tracked set; its history is kept
pub async fn delete(pool: &SqlitePool, asin: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tracked_products WHERE asin = ?")
        .bind(asin)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[tokio::test]
    async fn list_preserves_registration_order() {
        let pool = init_memory_database().await.unwrap();

        for asin in ["B000000001", "B000000002", "B000000003"] {
            upsert(&pool, &TrackedProduct::new(asin, None)).await.unwrap();
        }

        let products = list(&pool).await.unwrap();
        let asins: Vec<&str> = products.iter().map(|p| p.asin.as_str()).collect();
        assert_eq!(asins, vec!["B000000001", "B000000002", "B000000003"]);
    }

    #[tokio::test]
    async fn upsert_keeps_position_and_refreshes_name() {
        let pool = init_memory_database().await.unwrap();

        upsert(&pool, &TrackedProduct::new("B000000001", None)).await.unwrap();
        upsert(&pool, &TrackedProduct::new("B000000002", None)).await.unwrap();
        upsert(
            &pool,
            &TrackedProduct::new("B000000001", Some("relabeled".to_string())),
        )
        .await
        .unwrap();

        let products = list(&pool).await.unwrap();
        assert_eq!(products[0].asin, "B000000001");
        assert_eq!(products[0].display_name.as_deref(), Some("relabeled"));
        assert_eq!(products[1].asin, "B000000002");
    }

    #[tokio::test]
    async fn update_title_overwrites_display_name() {
        let pool = init_memory_database().await.unwrap();

        upsert(
            &pool,
            &TrackedProduct::new("B000000001", Some("operator memo".to_string())),
        )
        .await
        .unwrap();
        update_title(&pool, "B000000001", "Provider Title").await.unwrap();

        let products = list(&pool).await.unwrap();
        assert_eq!(products[0].display_name.as_deref(), Some("Provider Title"));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let pool = init_memory_database().await.unwrap();

        upsert(&pool, &TrackedProduct::new("B000000001", None)).await.unwrap();
        assert!(delete(&pool, "B000000001").await.unwrap());
        assert!(!delete(&pool, "B000000001").await.unwrap());
        assert!(list(&pool).await.unwrap().is_empty());
    }
}

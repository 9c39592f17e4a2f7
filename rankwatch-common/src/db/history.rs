//! Observation history store
//!
//! Append-only log of rank observations, logically partitioned by
//! (asin, category_id). Timestamps are stored as RFC 3339 UTC text, so
//! calendar-day prefixes and range comparisons work on the stored string.

use crate::types::{CategoryId, RankObservation, SourceMethod};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Append a batch of observations in one transaction
pub async fn append(pool: &SqlitePool, observations: &[RankObservation]) -> Result<()> {
    if observations.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for obs in observations {
        sqlx::query(
            r#"
            INSERT INTO rank_observations
                (observed_at, asin, title, category_id, category_name, rank, source)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(obs.observed_at.to_rfc3339())
        .bind(&obs.asin)
        .bind(&obs.title)
        .bind(obs.category_id.to_string())
        .bind(&obs.category_name)
        .bind(obs.rank.map(|r| r as i64))
        .bind(obs.source.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Query observations for one (asin, category) pair on one calendar day
pub async fn query(
    pool: &SqlitePool,
    asin: &str,
    category_id: CategoryId,
    date_prefix: &str,
) -> Result<Vec<RankObservation>> {
    let rows = sqlx::query(
        r#"
        SELECT observed_at, asin, title, category_id, category_name, rank, source
        FROM rank_observations
        WHERE asin = ? AND category_id = ? AND observed_at LIKE ?
        ORDER BY observed_at ASC
        "#,
    )
    .bind(asin)
    .bind(category_id.to_string())
    .bind(format!("{}%", date_prefix))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

/// Query all observations on or after midnight UTC of `since`
///
/// The notifier only ever inspects the previous calendar day, so callers
/// pass a short window instead of loading the whole table.
pub async fn query_since(pool: &SqlitePool, since: NaiveDate) -> Result<Vec<RankObservation>> {
    let floor = format!("{}T00:00:00+00:00", since.format("%Y-%m-%d"));

    let rows = sqlx::query(
        r#"
        SELECT observed_at, asin, title, category_id, category_name, rank, source
        FROM rank_observations
        WHERE observed_at >= ?
        ORDER BY observed_at ASC
        "#,
    )
    .bind(floor)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

/// Load the full history, oldest first
pub async fn query_all(pool: &SqlitePool) -> Result<Vec<RankObservation>> {
    let rows = sqlx::query(
        r#"
        SELECT observed_at, asin, title, category_id, category_name, rank, source
        FROM rank_observations
        ORDER BY observed_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(from_row).collect()
}

fn from_row(row: SqliteRow) -> Result<RankObservation> {
    let observed_at: String = row.get("observed_at");
    let category_id: String = row.get("category_id");
    let source: String = row.get("source");
    let rank: Option<i64> = row.get("rank");

    Ok(RankObservation {
        observed_at: DateTime::parse_from_rfc3339(&observed_at)
            .map_err(|e| Error::InvalidInput(format!("bad observed_at {:?}: {}", observed_at, e)))?
            .with_timezone(&Utc),
        asin: row.get("asin"),
        title: row.get("title"),
        category_id: category_id
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad category_id {:?}", category_id)))?,
        category_name: row.get("category_name"),
        rank: rank.and_then(|r| u32::try_from(r).ok()),
        source: SourceMethod::parse(&source)
            .ok_or_else(|| Error::InvalidInput(format!("bad source {:?}", source)))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use chrono::TimeZone;

    fn observation(asin: &str, category: u64, day: &str, rank: Option<u32>) -> RankObservation {
        let observed_at = format!("{}T10:00:00+00:00", day)
            .parse::<DateTime<Utc>>()
            .unwrap();
        RankObservation {
            observed_at,
            asin: asin.to_string(),
            title: "Title".to_string(),
            category_id: CategoryId(category),
            category_name: "Name".to_string(),
            rank,
            source: SourceMethod::DetailedList,
        }
    }

    #[tokio::test]
    async fn append_then_query_by_day() {
        let pool = init_memory_database().await.unwrap();

        append(
            &pool,
            &[
                observation("B0CTBW1WXG", 300, "2026-08-26", Some(50)),
                observation("B0CTBW1WXG", 300, "2026-08-27", Some(30)),
                observation("B0CTBW1WXG", 200, "2026-08-27", Some(9)),
            ],
        )
        .await
        .unwrap();

        let prior = query(&pool, "B0CTBW1WXG", CategoryId(300), "2026-08-26")
            .await
            .unwrap();
        assert_eq!(prior.len(), 1);
        assert_eq!(prior[0].rank, Some(50));

        let other_category = query(&pool, "B0CTBW1WXG", CategoryId(200), "2026-08-26")
            .await
            .unwrap();
        assert!(other_category.is_empty());
    }

    #[tokio::test]
    async fn query_since_bounds_the_window() {
        let pool = init_memory_database().await.unwrap();

        append(
            &pool,
            &[
                observation("A", 1, "2026-08-20", Some(1)),
                observation("A", 1, "2026-08-26", Some(2)),
                observation("A", 1, "2026-08-27", Some(3)),
            ],
        )
        .await
        .unwrap();

        let window = query_since(&pool, NaiveDate::from_ymd_opt(2026, 8, 26).unwrap())
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].rank, Some(2));
    }

    #[tokio::test]
    async fn absent_rank_round_trips_as_none() {
        let pool = init_memory_database().await.unwrap();

        append(&pool, &[observation("A", 1, "2026-08-27", None)])
            .await
            .unwrap();

        let all = query_all(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].rank, None);
        assert_eq!(
            all[0].observed_at,
            Utc.with_ymd_and_hms(2026, 8, 27, 10, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let pool = init_memory_database().await.unwrap();
        append(&pool, &[]).await.unwrap();
        assert!(query_all(&pool).await.unwrap().is_empty());
    }
}

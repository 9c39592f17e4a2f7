//! Database initialization

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist (idempotent)
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Tracked products; position preserves registration order across deletes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracked_products (
            asin TEXT PRIMARY KEY,
            display_name TEXT,
            position INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only observation history
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rank_observations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            observed_at TEXT NOT NULL,
            asin TEXT NOT NULL,
            title TEXT NOT NULL,
            category_id TEXT NOT NULL,
            category_name TEXT NOT NULL,
            rank INTEGER,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Lookup path for the day-over-day delta query
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_rank_observations_lookup
        ON rank_observations (asin, category_id, observed_at)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Open an isolated in-memory database, used by tests
///
/// Limited to a single connection: every in-memory connection is its own
/// database, so a larger pool would hand out empty databases.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

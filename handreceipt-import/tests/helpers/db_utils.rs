//! Database Test Utilities

use anyhow::Result;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create temporary test database with all tables initialized
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_handreceipt.db");

    let pool = handreceipt_import::db::init_database_pool(&db_path).await?;

    Ok((temp_dir, pool))
}

/// Row count of a table
pub async fn table_count(pool: &SqlitePool, table_name: &str) -> i64 {
    let query = format!("SELECT COUNT(*) FROM {}", table_name);
    sqlx::query_scalar(&query)
        .fetch_one(pool)
        .await
        .expect("count query")
}

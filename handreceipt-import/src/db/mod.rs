//! SQLite persistence for handreceipt-import
//!
//! One database file in the root folder holds the property inventory, its
//! import provenance, the append-only audit ledger and the import history.

pub mod imports;
pub mod ledger;
pub mod properties;

use handreceipt_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub use ledger::SqliteLedger;
pub use properties::SqlitePropertyStore;

/// Open (creating if needed) the database and ensure all tables exist
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables, indexes and ledger guards if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            serial_number TEXT NOT NULL UNIQUE CHECK (trim(serial_number) <> ''),
            nsn TEXT,
            holder TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            nsn_details TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS property_import_metadata (
            property_id TEXT PRIMARY KEY REFERENCES properties(id) ON DELETE CASCADE,
            source TEXT NOT NULL,
            form_reference TEXT,
            confidence REAL NOT NULL,
            serial_source TEXT NOT NULL,
            requires_verification INTEGER NOT NULL,
            metadata TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT NOT NULL UNIQUE,
            batch_id TEXT NOT NULL,
            property_id TEXT,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_entries_batch ON ledger_entries(batch_id)")
        .execute(pool)
        .await?;

    // Ledger rows are never rewritten
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS ledger_entries_no_update
        BEFORE UPDATE ON ledger_entries
        BEGIN
            SELECT RAISE(ABORT, 'ledger entries are append-only');
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS ledger_entries_no_delete
        BEFORE DELETE ON ledger_entries
        BEGIN
            SELECT RAISE(ABORT, 'ledger entries are append-only');
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            batch_id TEXT PRIMARY KEY,
            actor TEXT NOT NULL,
            form_reference TEXT,
            total INTEGER NOT NULL,
            created INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            invalid INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            overall_status TEXT NOT NULL,
            cancelled INTEGER NOT NULL DEFAULT 0,
            ledger_summary_reference TEXT,
            ledger_warnings TEXT NOT NULL DEFAULT '[]',
            adapter_notes TEXT NOT NULL DEFAULT '[]',
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batch_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES import_batches(batch_id) ON DELETE CASCADE,
            input_index INTEGER NOT NULL,
            unit_index INTEGER,
            status TEXT NOT NULL,
            property_id TEXT,
            outcome TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_import_batch_items_batch ON import_batch_items(batch_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (properties, property_import_metadata, ledger_entries, import_batches, import_batch_items)"
    );

    Ok(())
}

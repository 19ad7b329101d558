// src/common/migrations.rs
//! Database schema management

use sqlx::SqlitePool;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing; `reset` drops everything first.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("RESET_DB=true - Dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
        info!("Dropped old tables");
    }

    create_catalog_tables(pool).await?;
    create_session_table(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed successfully");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for table in ["session", "item", "category", "user"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn create_catalog_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name TEXT NOT NULL,
            user_email TEXT NOT NULL UNIQUE,
            user_picture TEXT,
            password_hash TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS category (
            category_id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_name TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES user(user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // item_price is free text on purpose
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item (
            item_id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_name TEXT NOT NULL,
            item_description TEXT,
            item_price TEXT,
            item_date TEXT NOT NULL,
            category_id INTEGER NOT NULL REFERENCES category(category_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_session_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session (
            session_id TEXT PRIMARY KEY,
            state TEXT,
            provider TEXT,
            access_token TEXT,
            provider_subject TEXT,
            user_id INTEGER,
            user_name TEXT,
            user_email TEXT,
            user_picture TEXT,
            flashes TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_category_name ON category(category_name)",
        "CREATE INDEX IF NOT EXISTS idx_item_category ON item(category_id)",
        "CREATE INDEX IF NOT EXISTS idx_item_date ON item(item_date)",
        "CREATE INDEX IF NOT EXISTS idx_session_updated_at ON session(updated_at)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database and its schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per embedded chunk, keyed by its metadata tuple. `id` is for
    // display only. The vector is a little-endian f32 blob.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            course TEXT NOT NULL,
            source_file TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            id TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (course, source_file, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Index-wide settings; currently only the established dimensionality.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

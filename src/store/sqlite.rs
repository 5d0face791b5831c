//! SQLite-backed [`VectorStore`] implementation.
//!
//! Chunks are stored in the `chunks` table created by [`crate::migrate`],
//! vectors as little-endian `f32` blobs. Queries load every vector and
//! rank in Rust; the index dimensionality lives in `index_meta`.

use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::Result;
use crate::models::{ChunkHit, ChunkMetadata, EmbeddedChunk, StoredChunk};

use super::{check_batch_dims, check_query_dims, rank_hits, DistanceMetric, VectorStore};

const DIMS_KEY: &str = "dims";

/// SQLite implementation of the [`VectorStore`] trait.
///
/// Wraps a [`SqlitePool`]; concurrent queries each borrow a pooled
/// connection and WAL mode keeps them from blocking on writers.
pub struct SqliteStore {
    pool: SqlitePool,
    metric: DistanceMetric,
}

impl SqliteStore {
    /// Wrap a pool whose schema has already been applied.
    pub fn new(pool: SqlitePool, metric: DistanceMetric) -> Self {
        Self { pool, metric }
    }

    /// Connect to `path`, apply the schema, and wrap the pool.
    pub async fn open(path: &std::path::Path, metric: DistanceMetric) -> anyhow::Result<Self> {
        let pool = crate::db::connect_path(path).await?;
        crate::migrate::apply(&pool).await?;
        Ok(Self::new(pool, metric))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn read_dims<'e, E>(executor: E) -> Result<Option<usize>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
        .bind(DIMS_KEY)
        .fetch_optional(executor)
        .await?;
    Ok(value.and_then(|v| v.parse().ok()))
}

async fn write_dims(conn: &mut SqliteConnection, dims: Option<usize>) -> Result<()> {
    match dims {
        Some(dims) => {
            sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?, ?)")
                .bind(DIMS_KEY)
                .bind(dims.to_string())
                .execute(&mut *conn)
                .await?;
        }
        None => {
            sqlx::query("DELETE FROM index_meta WHERE key = ?")
                .bind(DIMS_KEY)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

async fn insert_chunks(conn: &mut SqliteConnection, chunks: &[EmbeddedChunk]) -> Result<()> {
    for chunk in chunks {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, course, source_file, chunk_index, text, embedding)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(course, source_file, chunk_index) DO UPDATE SET
                id = excluded.id,
                text = excluded.text,
                embedding = excluded.embedding
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.metadata.course)
        .bind(&chunk.metadata.source_file)
        .bind(chunk.metadata.chunk_index as i64)
        .bind(&chunk.content)
        .bind(vec_to_blob(&chunk.embedding))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn delete_rows(conn: &mut SqliteConnection, course: &str, source_file: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM chunks WHERE course = ? AND source_file = ?")
        .bind(course)
        .bind(source_file)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn count_rows(conn: &mut SqliteConnection) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&mut *conn)
        .await?)
}

fn row_metadata(row: &sqlx::sqlite::SqliteRow) -> ChunkMetadata {
    let chunk_index: i64 = row.get("chunk_index");
    ChunkMetadata {
        course: row.get("course"),
        source_file: row.get("source_file"),
        chunk_index: chunk_index as u32,
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let established = read_dims(&mut *tx).await?;
        let dims = check_batch_dims(established, chunks)?;

        if established.is_none() {
            write_dims(&mut *tx, dims).await?;
        }
        insert_chunks(&mut *tx, chunks).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let established = read_dims(&self.pool).await?;
        if established.is_none() {
            return Ok(Vec::new());
        }
        check_query_dims(established, embedding)?;

        let rows = sqlx::query(
            "SELECT id, course, source_file, chunk_index, text, embedding FROM chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                ChunkHit {
                    id: row.get("id"),
                    content: row.get("text"),
                    metadata: row_metadata(row),
                    distance: self.metric.distance(embedding, &vector),
                }
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn get_all(&self) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(
            "SELECT id, course, source_file, chunk_index, text FROM chunks
             ORDER BY course, source_file, chunk_index",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoredChunk {
                id: row.get("id"),
                content: row.get("text"),
                metadata: row_metadata(row),
            })
            .collect())
    }

    async fn delete_source(&self, course: &str, source_file: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = delete_rows(&mut *tx, course, source_file).await?;
        if count_rows(&mut *tx).await? == 0 {
            write_dims(&mut *tx, None).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn replace_source(
        &self,
        course: &str,
        source_file: &str,
        chunks: &[EmbeddedChunk],
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let others: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chunks WHERE NOT (course = ? AND source_file = ?)",
        )
        .bind(course)
        .bind(source_file)
        .fetch_one(&mut *tx)
        .await?;
        let established = if others > 0 {
            read_dims(&mut *tx).await?
        } else {
            None
        };
        let dims = check_batch_dims(established, chunks)?;

        let removed = delete_rows(&mut *tx, course, source_file).await?;
        insert_chunks(&mut *tx, chunks).await?;
        write_dims(&mut *tx, if others + chunks.len() as i64 > 0 { dims } else { None }).await?;

        // Dropping `tx` on an early return rolls everything back.
        tx.commit().await?;
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn dims(&self) -> Result<Option<usize>> {
        read_dims(&self.pool).await
    }
}

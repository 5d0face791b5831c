//! Index statistics.
//!
//! `coach stats` prints the chunk count, the established embedding
//! dimensionality, and a per-document breakdown, to confirm that an
//! ingestion run landed where expected.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::store::{SqliteStore, VectorStore};

/// Chunk count for one ingested document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub course: String,
    pub source_file: String,
    pub chunk_count: i64,
}

pub async fn source_breakdown(pool: &SqlitePool) -> Result<Vec<SourceStats>> {
    let rows = sqlx::query(
        r#"
        SELECT course, source_file, COUNT(*) AS chunk_count
        FROM chunks
        GROUP BY course, source_file
        ORDER BY course, source_file
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SourceStats {
            course: row.get("course"),
            source_file: row.get("source_file"),
            chunk_count: row.get("chunk_count"),
        })
        .collect())
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db.path, config.retrieval.metric).await?;

    let total_chunks = store.count().await?;
    let dims = store.dims().await?;
    let sources = source_breakdown(store.pool()).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Study Coach — Index Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Chunks:      {}", total_chunks);
    println!(
        "  Dimensions:  {}",
        dims.map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    if !sources.is_empty() {
        println!();
        println!("  By document:");
        println!("  {:<20} {:<40} {:>8}", "COURSE", "SOURCE FILE", "CHUNKS");
        println!("  {}", "-".repeat(70));
        for s in &sources {
            println!(
                "  {:<20} {:<40} {:>8}",
                s.course, s.source_file, s.chunk_count
            );
        }
    }

    println!();

    store.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, EmbeddedChunk};
    use crate::store::DistanceMetric;
    use tempfile::TempDir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn test_source_breakdown() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&tmp.path().join("s.sqlite"), DistanceMetric::Cosine)
            .await
            .unwrap();
        let chunk = |file: &str, i: u32| {
            let metadata = ChunkMetadata {
                course: "ds".to_string(),
                source_file: file.to_string(),
                chunk_index: i,
            };
            EmbeddedChunk {
                id: metadata.chunk_id(),
                content: "x".to_string(),
                metadata,
                embedding: vec![1.0],
            }
        };
        store
            .upsert(&[chunk("b.txt", 0), chunk("a.txt", 0), chunk("a.txt", 1)])
            .await
            .unwrap();

        let sources = source_breakdown(store.pool()).await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_file, "a.txt");
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[1].chunk_count, 1);
    }
}

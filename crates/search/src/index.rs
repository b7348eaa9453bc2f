//! Vector index abstraction
//!
//! The pipeline talks to a small `VectorIndex` seam: upsert, nearest-neighbor
//! search, and content fetch. The production implementation rides pgvector;
//! an in-memory implementation backs tests and small deployments.

use argonaut_common::db::DbPool;
use argonaut_common::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored document chunk with its metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentRecord {
    /// Document ID
    pub id: Uuid,

    /// Chunk text
    pub content: String,

    /// Arbitrary metadata (region, parameter, platform, ...)
    pub metadata: Value,

    /// When the underlying observation was made
    pub source_timestamp: DateTime<Utc>,
}

/// Vector index seam
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a document and its embedding
    async fn upsert(&self, record: DocumentRecord, vector: Vec<f32>) -> Result<()>;

    /// Nearest-neighbor search; returns (id, similarity) ranked best-first
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(Uuid, f32)>>;

    /// Fetch full content + metadata for the given ids
    async fn get(&self, ids: &[Uuid]) -> Result<Vec<DocumentRecord>>;
}

/// pgvector-backed index over the `documents` table
pub struct PgVectorIndex {
    db: Arc<DbPool>,
}

impl PgVectorIndex {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Render an embedding as a pgvector literal.
    ///
    /// The floats come from the embedder, never from user text, so inlining
    /// the literal follows the same rules as any numeric constant.
    fn embedding_literal(embedding: &[f32]) -> String {
        format!(
            "[{}]",
            embedding
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn upsert(&self, record: DocumentRecord, vector: Vec<f32>) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO documents (id, content, metadata, source_timestamp, embedding)
            VALUES ($1, $2, $3, $4, '{}'::vector)
            ON CONFLICT (id) DO UPDATE
               SET content = EXCLUDED.content,
                   metadata = EXCLUDED.metadata,
                   source_timestamp = EXCLUDED.source_timestamp,
                   embedding = EXCLUDED.embedding
            "#,
            Self::embedding_literal(&vector)
        );

        self.db
            .primary
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                vec![
                    record.id.into(),
                    record.content.into(),
                    record.metadata.to_string().into(),
                    record.source_timestamp.into(),
                ],
            ))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Vector upsert failed: {}", e),
            })?;

        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(Uuid, f32)>> {
        let literal = Self::embedding_literal(vector);
        let sql = format!(
            r#"
            SELECT id, 1 - (embedding <=> '{literal}'::vector) AS similarity
            FROM documents
            ORDER BY embedding <=> '{literal}'::vector
            LIMIT $1
            "#,
        );

        let rows = self
            .db
            .read()
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                vec![(k as i64).into()],
            ))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Vector search failed: {}", e),
            })?;

        let hits = rows
            .iter()
            .filter_map(|row| {
                let id: Uuid = row.try_get("", "id").ok()?;
                let similarity: f64 = row.try_get("", "similarity").ok()?;
                Some((id, similarity as f32))
            })
            .collect();

        Ok(hits)
    }

    async fn get(&self, ids: &[Uuid]) -> Result<Vec<DocumentRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = r#"
            SELECT id, content, metadata, source_timestamp
            FROM documents
            WHERE id = ANY($1)
        "#;

        let rows = self
            .db
            .read()
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                vec![ids.to_vec().into()],
            ))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Document fetch failed: {}", e),
            })?;

        let mut by_id: HashMap<Uuid, DocumentRecord> = rows
            .iter()
            .filter_map(|row| {
                let id: Uuid = row.try_get("", "id").ok()?;
                let content: String = row.try_get("", "content").ok()?;
                let metadata: String = row.try_get("", "metadata").unwrap_or_default();
                let source_timestamp: DateTime<Utc> =
                    row.try_get("", "source_timestamp").ok()?;
                Some((
                    id,
                    DocumentRecord {
                        id,
                        content,
                        metadata: serde_json::from_str(&metadata).unwrap_or(Value::Null),
                        source_timestamp,
                    },
                ))
            })
            .collect();

        // Preserve the caller's id order (ranking order)
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

/// In-memory index with exact cosine search; used by tests and small corpora
#[derive(Default)]
pub struct MemoryVectorIndex {
    inner: RwLock<HashMap<Uuid, (DocumentRecord, Vec<f32>)>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, record: DocumentRecord, vector: Vec<f32>) -> Result<()> {
        self.inner.write().await.insert(record.id, (record, vector));
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(Uuid, f32)>> {
        let inner = self.inner.read().await;
        let mut scored: Vec<(Uuid, f32)> = inner
            .values()
            .map(|(record, stored)| (record.id, Self::cosine(vector, stored)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn get(&self, ids: &[Uuid]) -> Result<Vec<DocumentRecord>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.get(id).map(|(record, _)| record.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u128, content: &str) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::from_u128(id),
            content: content.to_string(),
            metadata: serde_json::json!({"region": "arabian sea"}),
            source_timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_index_roundtrip() {
        let index = MemoryVectorIndex::new();
        index.upsert(record(1, "warm water"), vec![1.0, 0.0]).await.unwrap();
        index.upsert(record(2, "cold water"), vec![0.0, 1.0]).await.unwrap();

        let hits = index.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits[0].0, Uuid::from_u128(1));
        assert!(hits[0].1 > hits[1].1);

        let docs = index.get(&[hits[0].0]).await.unwrap();
        assert_eq!(docs[0].content, "warm water");
    }

    #[test]
    fn test_embedding_literal_format() {
        assert_eq!(PgVectorIndex::embedding_literal(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert_eq!(MemoryVectorIndex::cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((MemoryVectorIndex::cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}

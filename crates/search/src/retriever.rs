//! Semantic retrieval
//!
//! Pipeline: embed the query, over-fetch 2k nearest neighbors to leave room
//! for post-filtering, fetch content + metadata, hard-exclude on metadata
//! filter mismatch, re-rank by composite score, truncate to k. Results are
//! cached under a normalized query hash; the cache is transparent to callers.

use argonaut_common::cache::{keys, CacheStore};
use argonaut_common::config::RetrievalConfig;
use argonaut_common::embeddings::Embedder;
use argonaut_common::errors::Result;
use argonaut_common::metrics::{Timer, METRICS_PREFIX};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::index::VectorIndex;
use crate::ranker::{passes_filters, ContextRanker, RetrievalCandidate};

/// Semantic retriever over a vector index
pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    ranker: ContextRanker,
    result_cache: Arc<dyn CacheStore>,
    config: RetrievalConfig,
}

impl SemanticRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        result_cache: Arc<dyn CacheStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            ranker: ContextRanker::new(&config),
            result_cache,
            config,
        }
    }

    /// Search for the top `k` passages relevant to `query_text`.
    ///
    /// `k` is clamped to `[1, max_results]`. When metadata filters are
    /// supplied, candidates failing any filter are excluded outright.
    pub async fn search(
        &self,
        query_text: &str,
        k: usize,
        metadata_filters: Option<&serde_json::Map<String, Value>>,
    ) -> Result<Vec<RetrievalCandidate>> {
        let _timer = Timer::start(format!("{}_retrieval_duration_seconds", METRICS_PREFIX));

        let k = k.clamp(1, self.config.max_results);
        let cache_key = result_cache_key(query_text, k, metadata_filters);

        if let Ok(Some(cached)) = self.result_cache.get(&cache_key).await {
            if let Ok(results) = serde_json::from_value::<Vec<RetrievalCandidate>>(cached) {
                counter!(format!("{}_cache_hits_total", METRICS_PREFIX)).increment(1);
                debug!(query = query_text, k, "Retrieval cache hit");
                return Ok(results);
            }
        }

        let results = self
            .search_uncached(query_text, k, metadata_filters, Utc::now())
            .await?;

        if let Ok(value) = serde_json::to_value(&results) {
            let _ = self.result_cache.set(&cache_key, value).await;
        }

        Ok(results)
    }

    /// Uncached search against a fixed `now`, for deterministic scoring
    pub async fn search_uncached(
        &self,
        query_text: &str,
        k: usize,
        metadata_filters: Option<&serde_json::Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RetrievalCandidate>> {
        let k = k.clamp(1, self.config.max_results);

        let vector = self.embedder.embed(query_text).await?;

        // Over-fetch to leave room for metadata filtering
        let hits = self.index.search(&vector, k * 2).await?;
        let ids: Vec<_> = hits.iter().map(|(id, _)| *id).collect();
        let documents = self.index.get(&ids).await?;

        let mut candidates: Vec<RetrievalCandidate> = documents
            .into_iter()
            .filter(|doc| passes_filters(&doc.metadata, metadata_filters))
            .map(|doc| {
                let similarity = hits
                    .iter()
                    .find(|(id, _)| *id == doc.id)
                    .map(|(_, s)| *s)
                    .unwrap_or(0.0);
                RetrievalCandidate {
                    id: doc.id,
                    content: doc.content,
                    metadata: doc.metadata,
                    source_timestamp: doc.source_timestamp,
                    similarity,
                    relevance: 0.0,
                    metadata_match: 0.0,
                    composite_score: 0.0,
                }
            })
            .collect();

        let keywords = query_keywords(query_text);
        self.ranker
            .rank(&mut candidates, &keywords, metadata_filters, now);
        candidates.truncate(k);

        debug!(
            query = query_text,
            k,
            returned = candidates.len(),
            "Semantic retrieval complete"
        );

        Ok(candidates)
    }
}

/// Content keywords from the query: lowercase words longer than three chars
fn query_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|w| w.len() > 3)
        .collect()
}

fn result_cache_key(
    query: &str,
    k: usize,
    filters: Option<&serde_json::Map<String, Value>>,
) -> String {
    match filters {
        Some(filters) if !filters.is_empty() => {
            let filter_repr = serde_json::to_string(filters).unwrap_or_default();
            keys::search_result(&format!("{} {}", query, filter_repr), k)
        }
        _ => keys::search_result(query, k),
    }
}

//! Embedding service abstraction
//!
//! Provides a unified interface over embedding providers plus a caching
//! wrapper. Query-time embeddings must come from the same model/version the
//! index was built with, or recall silently degrades; `model_name` exists so
//! callers can assert that.

use crate::cache::{keys, CacheStore};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// HTTP embedding client (OpenAI-compatible endpoint)
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a new HTTP embedder
    pub fn new(
        api_key: String,
        model: String,
        dimension: usize,
        base_url: Option<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model,
            dimension,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_retries,
        })
    }

    /// Make request with exponential-backoff retry
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Embedding request failed, retrying"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::AiService {
            service: "embedding".to_string(),
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::AiService {
                service: "embedding".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AiService {
                service: "embedding".to_string(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: EmbeddingResponse =
            response.json().await.map_err(|e| AppError::AiService {
                service: "embedding".to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        let embeddings: Vec<Vec<f32>> = result.data.into_iter().map(|e| e.embedding).collect();

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(AppError::AiService {
                    service: "embedding".to_string(),
                    message: format!(
                        "Dimension mismatch: expected {}, got {}",
                        self.dimension,
                        embedding.len()
                    ),
                });
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_with_retry(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::AiService {
                service: "embedding".to_string(),
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        const BATCH_SIZE: usize = 100;

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let embeddings = self.request_with_retry(chunk).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic mock embedder for testing.
///
/// Same text always embeds to the same vector, so retrieval tests behave
/// like a fixed index model.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use rand::{Rng, SeedableRng};
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(text.as_bytes());
        let seed = u64::from_le_bytes(digest[..8].try_into().unwrap_or_default());
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

        Ok((0..self.dimension).map(|_| rng.gen_range(-1.0..1.0)).collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Caching wrapper keyed by a normalized hash of the input text
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Arc<dyn CacheStore>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: Arc<dyn CacheStore>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = keys::embedding(self.inner.model_name(), text);

        if let Ok(Some(cached)) = self.cache.get(&key).await {
            if let Ok(vector) = serde_json::from_value::<Vec<f32>>(cached) {
                return Ok(vector);
            }
        }

        let vector = self.inner.embed(text).await?;

        if let Err(e) = self.cache.set(&key, serde_json::to_value(&vector)?).await {
            tracing::warn!(error = %e, "Failed to cache embedding");
        }

        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &crate::config::EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "http" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "embedding.api_key required for the http provider".to_string(),
            })?;
            Ok(Arc::new(HttpEmbedder::new(
                key,
                config.model.clone(),
                config.dimension,
                config.api_base.clone(),
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )?))
        }
        "mock" => Ok(Arc::new(MockEmbedder::new(config.dimension))),
        other => {
            tracing::warn!(provider = other, "Unknown embedding provider, using mock");
            Ok(Arc::new(MockEmbedder::new(config.dimension)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoundedMemoryCache;

    #[tokio::test]
    async fn test_mock_embedder_dimension() {
        let embedder = MockEmbedder::new(768);
        let embedding = embedder.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 768);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("salinity near the equator").await.unwrap();
        let b = embedder.embed("salinity near the equator").await.unwrap();
        let c = embedder.embed("something else").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_cached_embedder_hits_cache() {
        let cache = Arc::new(BoundedMemoryCache::new(16));
        let embedder = CachedEmbedder::new(Arc::new(MockEmbedder::new(32)), cache.clone());

        let first = embedder.embed("ocean temperature").await.unwrap();
        assert_eq!(cache.len().await, 1);

        let second = embedder.embed("Ocean  Temperature").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len().await, 1);
    }
}

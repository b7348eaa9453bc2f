//! Configuration management for the Argonaut pipeline
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<env>, config/local)
//! - Default values
//!
//! Empirically chosen constants (ranking weights, the recency window, the
//! evidence character budget) live here rather than in code so deployments
//! can tune them.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Query understanding configuration
    pub pipeline: PipelineConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration
    pub redis: RedisConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Generation service configuration
    pub generation: GenerationConfig,

    /// Retrieval and ranking configuration
    pub retrieval: RetrievalConfig,

    /// Evidence assembly configuration
    pub evidence: EvidenceConfig,

    /// Conversation history configuration
    pub conversation: ConversationConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Working language for analysis (ISO 639-1)
    #[serde(default = "default_working_language")]
    pub working_language: String,

    /// Intent confidence below which disambiguation is suggested
    #[serde(default = "default_min_intent_confidence")]
    pub min_intent_confidence: f32,

    /// Maximum clarification questions per analysis
    #[serde(default = "default_max_clarifications")]
    pub max_clarifications: usize,

    /// Translator provider: none, http
    #[serde(default = "default_translator_provider")]
    pub translator_provider: String,

    /// Translator endpoint (for the http provider)
    pub translator_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Statement timeout in seconds (second line of defense for row caps)
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL (optional; in-process caches are used when absent)
    pub url: Option<String>,

    /// Default TTL in seconds
    #[serde(default = "default_redis_ttl")]
    pub default_ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: http, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use; must match the model the index was built with
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// API endpoint (chat-completions compatible)
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// API key
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failure
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,

    /// Token-bucket refill rate (requests per second)
    #[serde(default = "default_generation_rps")]
    pub requests_per_second: u32,

    /// Token-bucket burst capacity
    #[serde(default = "default_generation_burst")]
    pub burst: u32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Weight for raw embedding similarity
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f32,

    /// Weight for keyword relevance
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f32,

    /// Weight for document recency
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f32,

    /// Weight for metadata filter match
    #[serde(default = "default_metadata_weight")]
    pub metadata_weight: f32,

    /// Trailing window for recency-worded queries, in days
    #[serde(default = "default_recency_window_days")]
    pub recency_window_days: i64,

    /// Hard cap on requested result count
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Bounded embedding-cache capacity (entries)
    #[serde(default = "default_embedding_cache_capacity")]
    pub embedding_cache_capacity: usize,

    /// Bounded result-cache capacity (entries)
    #[serde(default = "default_result_cache_capacity")]
    pub result_cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvidenceConfig {
    /// Character budget for ranked passage text
    #[serde(default = "default_passage_char_budget")]
    pub passage_char_budget: usize,

    /// Default row cap applied to structured queries without a limit
    #[serde(default = "default_row_cap")]
    pub default_row_cap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// Maximum messages retained per conversation
    #[serde(default = "default_conversation_capacity")]
    pub max_messages: usize,

    /// Idle TTL in seconds before a conversation is evicted
    #[serde(default = "default_conversation_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_working_language() -> String { "en".to_string() }
fn default_min_intent_confidence() -> f32 { 0.6 }
fn default_max_clarifications() -> usize { 2 }
fn default_translator_provider() -> String { "none".to_string() }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_statement_timeout() -> u64 { 30 }
fn default_redis_ttl() -> u64 { 300 }
fn default_key_prefix() -> String { "argonaut".to_string() }
fn default_embedding_provider() -> String { "http".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 768 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_ai_retries() -> u32 { 3 }
fn default_generation_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_generation_model() -> String { "gpt-4o-mini".to_string() }
fn default_generation_timeout() -> u64 { 30 }
fn default_generation_rps() -> u32 { 5 }
fn default_generation_burst() -> u32 { 10 }
fn default_max_tokens() -> usize { 1000 }
fn default_similarity_weight() -> f32 { 0.2 }
fn default_relevance_weight() -> f32 { 0.4 }
fn default_recency_weight() -> f32 { 0.3 }
fn default_metadata_weight() -> f32 { 0.1 }
fn default_recency_window_days() -> i64 { 180 }
fn default_max_results() -> usize { 50 }
fn default_embedding_cache_capacity() -> usize { 512 }
fn default_result_cache_capacity() -> usize { 256 }
fn default_passage_char_budget() -> usize { 2000 }
fn default_row_cap() -> usize { 100 }
fn default_conversation_capacity() -> usize { 50 }
fn default_conversation_ttl() -> u64 { 1800 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "argonaut".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. APP__RETRIEVAL__RECENCY_WINDOW_DAYS=90
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the embedding timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }

    /// Get the generation timeout as Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                working_language: default_working_language(),
                min_intent_confidence: default_min_intent_confidence(),
                max_clarifications: default_max_clarifications(),
                translator_provider: default_translator_provider(),
                translator_endpoint: None,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/argonaut".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                statement_timeout_secs: default_statement_timeout(),
            },
            redis: RedisConfig {
                url: None,
                default_ttl_secs: default_redis_ttl(),
                key_prefix: default_key_prefix(),
            },
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_ai_retries(),
            },
            generation: GenerationConfig {
                endpoint: default_generation_endpoint(),
                api_key: None,
                model: default_generation_model(),
                timeout_secs: default_generation_timeout(),
                max_retries: default_ai_retries(),
                requests_per_second: default_generation_rps(),
                burst: default_generation_burst(),
                max_tokens: default_max_tokens(),
            },
            retrieval: RetrievalConfig::default(),
            evidence: EvidenceConfig {
                passage_char_budget: default_passage_char_budget(),
                default_row_cap: default_row_cap(),
            },
            conversation: ConversationConfig {
                max_messages: default_conversation_capacity(),
                ttl_secs: default_conversation_ttl(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_weight: default_similarity_weight(),
            relevance_weight: default_relevance_weight(),
            recency_weight: default_recency_weight(),
            metadata_weight: default_metadata_weight(),
            recency_window_days: default_recency_window_days(),
            max_results: default_max_results(),
            embedding_cache_capacity: default_embedding_cache_capacity(),
            result_cache_capacity: default_result_cache_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.working_language, "en");
        assert_eq!(config.retrieval.recency_window_days, 180);
        assert_eq!(config.evidence.passage_char_budget, 2000);
    }

    #[test]
    fn test_default_ranking_weights_sum_to_one() {
        let r = RetrievalConfig::default();
        let sum = r.similarity_weight + r.relevance_weight + r.recency_weight + r.metadata_weight;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/argonaut");
    }
}

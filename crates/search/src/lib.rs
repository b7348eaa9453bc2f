//! Argonaut Retrieval
//!
//! Provides the retrieval half of the pipeline:
//! - Temporal/semantic routing (calendar queries go to SQL, topical queries
//!   go to the vector index)
//! - Vector index abstraction with a pgvector implementation
//! - Semantic retrieval with composite-score ranking
//! - Structured query translation with mandatory security validation
//! - The relational executor edge

pub mod executor;
pub mod index;
pub mod ranker;
pub mod retriever;
pub mod router;
pub mod translator;

pub use executor::{RelationalExecutor, Row, SeaOrmExecutor};
pub use index::{DocumentRecord, MemoryVectorIndex, PgVectorIndex, VectorIndex};
pub use ranker::{ContextRanker, RetrievalCandidate};
pub use retriever::SemanticRetriever;
pub use router::{RouteKind, TemporalDetector, TemporalInfo};
pub use translator::{GeneratedQuery, QueryKind, QueryTranslator};

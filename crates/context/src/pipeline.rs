//! The end-to-end answer pipeline
//!
//! Within one request the steps are strictly sequential: analyze -> route ->
//! retrieve or translate+execute -> assemble -> generate -> fact-check ->
//! score. Requests are independent of each other; the only shared state is
//! the injected caches and conversation store. Every external call runs
//! under a timeout, and any non-recoverable failure degrades to a polite
//! error answer instead of propagating.

use argonaut_common::conversation::{ConversationStore, Message};
use argonaut_common::errors::{AppError, Result};
use argonaut_common::metrics::{Timer, METRICS_PREFIX};
use argonaut_nlu::engine::QueryEngine;
use argonaut_nlu::types::QueryAnalysis;
use argonaut_search::executor::{RelationalExecutor, Row};
use argonaut_search::retriever::SemanticRetriever;
use argonaut_search::router::{describe_period, RouteKind, TemporalDetector};
use argonaut_search::translator::QueryTranslator;
use chrono::Utc;
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::answer::{Answer, StandardAnswer, TemporalAnswer};
use crate::assembler::{EvidenceAssembler, EvidenceBundle};
use crate::factcheck::FactChecker;
use crate::generation::GenerationService;
use crate::quality::QualityScorer;

/// Default passage count requested from the semantic path
const SEMANTIC_K: usize = 10;

/// Fixed confidence floor blended with analysis confidence for answers
/// that survived generation
const ANSWER_BASE_CONFIDENCE: f32 = 0.5;

/// The assembled pipeline
pub struct Pipeline {
    engine: QueryEngine,
    detector: TemporalDetector,
    translator: QueryTranslator,
    executor: Arc<dyn RelationalExecutor>,
    retriever: Arc<SemanticRetriever>,
    generator: Arc<dyn GenerationService>,
    assembler: EvidenceAssembler,
    fact_checker: FactChecker,
    scorer: QualityScorer,
    conversations: Arc<dyn ConversationStore>,
    generation_timeout: Duration,
    executor_timeout: Duration,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: QueryEngine,
        detector: TemporalDetector,
        translator: QueryTranslator,
        executor: Arc<dyn RelationalExecutor>,
        retriever: Arc<SemanticRetriever>,
        generator: Arc<dyn GenerationService>,
        assembler: EvidenceAssembler,
        conversations: Arc<dyn ConversationStore>,
        generation_timeout: Duration,
        executor_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            detector,
            translator,
            executor,
            retriever,
            generator,
            assembler,
            fact_checker: FactChecker::new(),
            scorer: QualityScorer::new(),
            conversations,
            generation_timeout,
            executor_timeout,
        }
    }

    /// Answer a question end to end. Total: every failure mode maps to an
    /// `Answer` variant.
    pub async fn answer(&self, text: &str, session: Option<Uuid>) -> Answer {
        counter!(format!("{}_queries_total", METRICS_PREFIX)).increment(1);

        if let Some(session) = session {
            let _ = self.conversations.append(session, Message::user(text)).await;
        }

        let analysis = self.engine.analyze(text, None).await;
        let route = self.detector.route(text);
        counter!(format!("{}_route_total", METRICS_PREFIX), "route" => match route {
            RouteKind::Temporal => "temporal",
            RouteKind::Semantic => "semantic",
        })
        .increment(1);

        let answer = match self.answer_inner(text, &analysis).await {
            Ok(answer) => answer,
            Err(e) => {
                counter!(format!("{}_degraded_answers_total", METRICS_PREFIX)).increment(1);
                warn!(error = %e, query = text, "Pipeline degraded to error answer");
                Answer::degraded(&e)
            }
        };

        if let Some(session) = session {
            let _ = self
                .conversations
                .append(session, Message::assistant(answer.text()))
                .await;
        }

        answer
    }

    /// Build the evidence for a request and report which path produced it.
    ///
    /// On the temporal path the structured rows *are* the evidence and no
    /// vector search runs; zero rows is a legitimate, empty bundle.
    pub async fn route_and_answer(
        &self,
        text: &str,
        analysis: &QueryAnalysis,
    ) -> Result<(EvidenceBundle, RouteKind)> {
        match self.detector.route(text) {
            RouteKind::Temporal => match self.structured_evidence(analysis).await {
                Ok(rows) => Ok((
                    self.assembler.assemble(analysis, Some(rows), None),
                    RouteKind::Temporal,
                )),
                // A temporal query we cannot translate (no template for the
                // intent) still deserves an answer; fall back to semantic
                Err(AppError::Translation { intent }) => {
                    warn!(intent = %intent, "No template for temporal query, falling back to semantic");
                    let passages = self.semantic_evidence(text, analysis).await?;
                    Ok((
                        self.assembler.assemble(analysis, None, Some(passages)),
                        RouteKind::Semantic,
                    ))
                }
                Err(e) => Err(e),
            },
            RouteKind::Semantic => {
                let passages = self.semantic_evidence(text, analysis).await?;
                Ok((
                    self.assembler.assemble(analysis, None, Some(passages)),
                    RouteKind::Semantic,
                ))
            }
        }
    }

    async fn answer_inner(&self, text: &str, analysis: &QueryAnalysis) -> Result<Answer> {
        let (bundle, effective_route) = self.route_and_answer(text, analysis).await?;

        // The absence of data for a period is a reportable fact, and cheap:
        // skip generation entirely
        if effective_route == RouteKind::Temporal && bundle.is_empty() {
            let info = self.detector.extract_temporal_info(text, Utc::now());
            return Ok(Answer::no_data(&describe_period(&info)));
        }

        let prompt = self.assembler.build_prompt(analysis, &bundle);

        let prose = {
            let _timer = Timer::start(format!("{}_generation_duration_seconds", METRICS_PREFIX));
            tokio::time::timeout(self.generation_timeout, self.generator.generate(&prompt))
                .await
                .map_err(|_| AppError::AiTimeout {
                    service: "generation".to_string(),
                    timeout_ms: self.generation_timeout.as_millis() as u64,
                })??
        };

        // Best-effort passes; neither blocks the response
        let fact_check = self.fact_checker.check(&prose, &bundle.structured_rows);
        let quality = self
            .scorer
            .score(&analysis.original_query, &prose, &fact_check);

        if !fact_check.is_clean() {
            info!(
                numeric_flags = fact_check.numeric_flags.len(),
                contradiction_flags = fact_check.contradiction_flags.len(),
                "Fact check raised flags"
            );
        }

        let confidence =
            (ANSWER_BASE_CONFIDENCE + analysis.confidence * ANSWER_BASE_CONFIDENCE).clamp(0.0, 1.0);

        let answer = match effective_route {
            RouteKind::Temporal => {
                let info = self.detector.extract_temporal_info(text, Utc::now());
                Answer::Temporal(TemporalAnswer {
                    text: prose,
                    confidence,
                    period: describe_period(&info),
                    row_count: bundle.structured_rows.len(),
                    quality: Some(quality),
                })
            }
            RouteKind::Semantic => Answer::Standard(StandardAnswer {
                text: prose,
                confidence,
                source_ids: bundle.ranked_passages.iter().map(|p| p.id).collect(),
                quality: Some(quality),
            }),
        };

        Ok(answer)
    }

    async fn structured_evidence(&self, analysis: &QueryAnalysis) -> Result<Vec<Row>> {
        let query = self.translator.translate(analysis, None)?;

        tokio::time::timeout(self.executor_timeout, self.executor.execute(&query))
            .await
            .map_err(|_| AppError::AiTimeout {
                service: "relational-executor".to_string(),
                timeout_ms: self.executor_timeout.as_millis() as u64,
            })?
    }

    async fn semantic_evidence(
        &self,
        text: &str,
        analysis: &QueryAnalysis,
    ) -> Result<Vec<argonaut_search::ranker::RetrievalCandidate>> {
        let filters = region_filters(analysis);
        self.retriever
            .search(text, SEMANTIC_K, filters.as_ref())
            .await
    }
}

/// Metadata filters derived from the spatial scope
fn region_filters(analysis: &QueryAnalysis) -> Option<serde_json::Map<String, Value>> {
    let region = analysis
        .spatial
        .regions
        .first()
        .or_else(|| analysis.spatial.ocean_basins.first())?;

    let mut filters = serde_json::Map::new();
    filters.insert("region".to_string(), Value::from(region.clone()));
    Some(filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGenerator;
    use argonaut_common::cache::BoundedMemoryCache;
    use argonaut_common::config::{PipelineConfig, RetrievalConfig};
    use argonaut_common::conversation::MemoryConversationStore;
    use argonaut_common::embeddings::{Embedder, MockEmbedder};
    use argonaut_nlu::translate::NoopTranslator;
    use argonaut_search::executor::RelationalExecutor;
    use argonaut_search::index::{DocumentRecord, MemoryVectorIndex, VectorIndex};
    use argonaut_search::translator::GeneratedQuery;
    use async_trait::async_trait;

    struct StubExecutor {
        rows: Vec<Row>,
    }

    #[async_trait]
    impl RelationalExecutor for StubExecutor {
        async fn execute(&self, query: &GeneratedQuery) -> Result<Vec<Row>> {
            assert!(query.security_validated);
            Ok(self.rows.clone())
        }
    }

    async fn pipeline_with(rows: Vec<Row>, generator: Arc<dyn GenerationService>) -> Pipeline {
        let embedder = Arc::new(MockEmbedder::new(32));
        let index = Arc::new(MemoryVectorIndex::new());

        for (id, content) in [
            (1u128, "salinity varies with depth across the thermocline"),
            (2, "temperature profiles show seasonal warming"),
            (3, "float deployments in the arabian sea"),
        ] {
            let vector = embedder.embed(content).await.unwrap();
            index
                .upsert(
                    DocumentRecord {
                        id: Uuid::from_u128(id),
                        content: content.to_string(),
                        metadata: serde_json::json!({}),
                        source_timestamp: Utc::now(),
                    },
                    vector,
                )
                .await
                .unwrap();
        }

        let retriever = Arc::new(SemanticRetriever::new(
            embedder,
            index,
            Arc::new(BoundedMemoryCache::new(16)),
            RetrievalConfig::default(),
        ));

        let engine = QueryEngine::new(
            Arc::new(NoopTranslator),
            PipelineConfig {
                working_language: "en".to_string(),
                min_intent_confidence: 0.6,
                max_clarifications: 2,
                translator_provider: "none".to_string(),
                translator_endpoint: None,
            },
        );

        Pipeline::new(
            engine,
            TemporalDetector::new(180),
            QueryTranslator::new(100),
            Arc::new(StubExecutor { rows }),
            retriever,
            generator,
            EvidenceAssembler::new(2000),
            Arc::new(MemoryConversationStore::new(50, Duration::from_secs(1800))),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    fn sample_rows() -> Vec<Row> {
        vec![vec![
            ("sample_count".to_string(), serde_json::json!(42)),
            ("mean_value".to_string(), serde_json::json!(35.1)),
            ("min_value".to_string(), serde_json::json!(34.2)),
            ("max_value".to_string(), serde_json::json!(36.0)),
        ]]
    }

    #[tokio::test]
    async fn test_semantic_query_yields_standard_answer() {
        let pipeline = pipeline_with(vec![], Arc::new(MockGenerator::new())).await;
        let answer = pipeline
            .answer("how does salinity vary with depth", None)
            .await;

        match answer {
            Answer::Standard(a) => {
                assert!(!a.text.is_empty());
                assert!(!a.source_ids.is_empty());
                assert!(a.quality.is_some());
                assert!((0.0..=1.0).contains(&a.confidence));
            }
            other => panic!("expected standard answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_temporal_query_yields_temporal_answer() {
        let pipeline = pipeline_with(sample_rows(), Arc::new(MockGenerator::new())).await;
        let answer = pipeline
            .answer("What was the salinity in October 2024?", None)
            .await;

        match answer {
            Answer::Temporal(a) => {
                assert_eq!(a.period, "2024-10");
                assert_eq!(a.row_count, 1);
                assert!(a.quality.is_some());
            }
            other => panic!("expected temporal answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_temporal_no_rows_is_no_data_not_error() {
        let pipeline = pipeline_with(vec![], Arc::new(MockGenerator::new())).await;
        let answer = pipeline
            .answer("What was the salinity in October 2024?", None)
            .await;

        match &answer {
            Answer::NoData(a) => {
                assert_eq!(a.period, "2024-10");
                assert!(a.text.contains("2024-10"));
            }
            other => panic!("expected no-data answer, got {:?}", other),
        }
        assert!(!answer.is_error());
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_politely() {
        let pipeline = pipeline_with(sample_rows(), Arc::new(MockGenerator::failing())).await;
        let answer = pipeline
            .answer("What was the salinity in October 2024?", None)
            .await;

        assert!(answer.is_error());
        assert_eq!(answer.confidence(), 0.0);

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["query_type"], "error");
    }

    #[tokio::test]
    async fn test_unknown_intent_temporal_falls_back_to_semantic() {
        let pipeline = pipeline_with(vec![], Arc::new(MockGenerator::new())).await;
        // Contains a year (routes temporal) but no recognizable intent, so
        // no template exists
        let answer = pipeline.answer("things that happened in 1998", None).await;

        match answer {
            Answer::Standard(_) => {}
            other => panic!("expected semantic fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_conversation_history_recorded() {
        let pipeline = pipeline_with(vec![], Arc::new(MockGenerator::new())).await;
        let session = Uuid::new_v4();

        pipeline
            .answer("how does salinity vary with depth", Some(session))
            .await;

        let history = pipeline.conversations.get(session).await.unwrap();
        assert_eq!(history.len(), 2);
    }
}

//! Query Understanding Engine
//!
//! Composes entity extraction, intent classification, and the scope parsers
//! into one `QueryAnalysis`. Never fails hard: internal errors degrade to an
//! `UNKNOWN` analysis with confidence 0; callers check confidence, not
//! exceptions.

use argonaut_common::config::PipelineConfig;
use argonaut_common::metrics::{Timer, METRICS_PREFIX};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::entities::EntityExtractor;
use crate::intent::IntentClassifier;
use crate::scope;
use crate::translate::{detect_language, Translator};
use crate::types::QueryAnalysis;

/// Query understanding engine
pub struct QueryEngine {
    extractor: EntityExtractor,
    classifier: IntentClassifier,
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
}

impl QueryEngine {
    pub fn new(translator: Arc<dyn Translator>, config: PipelineConfig) -> Self {
        Self {
            extractor: EntityExtractor::new(),
            classifier: IntentClassifier::new(),
            translator,
            config,
        }
    }

    /// Analyze a query. Total: always returns an analysis.
    pub async fn analyze(&self, text: &str, language_preference: Option<&str>) -> QueryAnalysis {
        let _timer = Timer::start(format!("{}_analyze_duration_seconds", METRICS_PREFIX));

        match self.analyze_inner(text, language_preference).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, query = text, "Query analysis degraded");
                QueryAnalysis::degraded(text, &e.to_string())
            }
        }
    }

    async fn analyze_inner(
        &self,
        text: &str,
        language_preference: Option<&str>,
    ) -> argonaut_common::Result<QueryAnalysis> {
        let detected_language = language_preference
            .map(|l| l.to_string())
            .unwrap_or_else(|| detect_language(text));

        // Analysis runs on the working language; the original text is
        // preserved in the result either way
        let working_text = if detected_language != self.config.working_language {
            match self
                .translator
                .translate(text, &detected_language, &self.config.working_language)
                .await
            {
                Ok(translated) => translated,
                Err(e) => {
                    warn!(
                        error = %e,
                        translator = self.translator.name(),
                        "Translation failed, analyzing original text"
                    );
                    text.to_string()
                }
            }
        } else {
            text.to_string()
        };

        let entities = self.extractor.extract(&working_text);
        let (intent, confidence) = self.classifier.classify(&working_text);

        debug!(
            intent = ?intent,
            confidence,
            entity_count = entities.len(),
            "Query classified"
        );

        let spatial = scope::parse_spatial(&entities);
        let temporal = scope::parse_temporal(&entities);
        let parameters = scope::parse_parameters(&entities);

        let mut analysis = QueryAnalysis {
            original_query: text.to_string(),
            detected_language,
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            entities,
            spatial,
            temporal,
            parameters,
            disambiguation_needed: false,
            clarification_questions: Vec::new(),
            metadata: Default::default(),
        };

        self.check_disambiguation(&mut analysis);

        Ok(analysis)
    }

    /// Advisory disambiguation check; callers may proceed without resolving
    fn check_disambiguation(&self, analysis: &mut QueryAnalysis) {
        let mut questions = Vec::new();

        if analysis.intent.requires_location() && analysis.spatial.is_empty() {
            questions.push("Which ocean region or area should I look at?".to_string());
        }

        if analysis.intent.requires_time_window() && analysis.temporal.is_empty() {
            questions.push(
                "Which time period are you interested in (for example 'March 2023' or 'last 90 days')?"
                    .to_string(),
            );
        }

        if analysis.confidence < self.config.min_intent_confidence {
            questions.push(
                "Could you say more about what you want to know from the float data?".to_string(),
            );
        }

        questions.truncate(self.config.max_clarifications);

        if !questions.is_empty() {
            analysis.disambiguation_needed = true;
            analysis.clarification_questions = questions;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::NoopTranslator;
    use crate::types::{EntityLabel, Intent};

    fn engine() -> QueryEngine {
        QueryEngine::new(Arc::new(NoopTranslator), PipelineConfig {
            working_language: "en".to_string(),
            min_intent_confidence: 0.6,
            max_clarifications: 2,
            translator_provider: "none".to_string(),
            translator_endpoint: None,
        })
    }

    #[tokio::test]
    async fn test_analyze_total_and_bounded() {
        let engine = engine();
        for text in ["", "?????", "salinity in October 2024", "由来不明の文字列"] {
            let analysis = engine.analyze(text, None).await;
            assert!((0.0..=1.0).contains(&analysis.confidence));
            assert_eq!(analysis.original_query, text);
        }
    }

    #[tokio::test]
    async fn test_arabian_sea_scenario() {
        let engine = engine();
        let analysis = engine
            .analyze("show me recent float temperature near the Arabian Sea", None)
            .await;

        assert_eq!(analysis.intent, Intent::AnalyzeTemperature);
        assert!(analysis
            .spatial
            .regions
            .contains(&"arabian sea".to_string()));
        assert!(analysis.temporal.relative_time.is_some());
    }

    #[tokio::test]
    async fn test_entities_do_not_overlap() {
        let engine = engine();
        let analysis = engine
            .analyze("sea surface temperature near 12.5, 70.25 in October 2024", None)
            .await;

        for (i, a) in analysis.entities.iter().enumerate() {
            for b in analysis.entities.iter().skip(i + 1) {
                assert!(!a.overlaps(b));
            }
        }
        assert!(analysis
            .entities
            .iter()
            .any(|e| e.label == EntityLabel::Coordinate));
    }

    #[tokio::test]
    async fn test_disambiguation_for_unclear_query() {
        let engine = engine();
        let analysis = engine.analyze("tell me something", None).await;

        assert_eq!(analysis.intent, Intent::Unknown);
        assert!(analysis.disambiguation_needed);
        assert!(!analysis.clarification_questions.is_empty());
        assert!(analysis.clarification_questions.len() <= 2);
    }

    #[tokio::test]
    async fn test_map_intent_without_location_asks() {
        let engine = engine();
        let analysis = engine.analyze("where are the floats?", None).await;

        assert_eq!(analysis.intent, Intent::MapFloats);
        assert!(analysis.disambiguation_needed);
        assert!(analysis.clarification_questions[0].contains("region"));
    }

    #[tokio::test]
    async fn test_language_preference_respected() {
        let engine = engine();
        let analysis = engine.analyze("salinity near the equator", Some("en")).await;
        assert_eq!(analysis.detected_language, "en");
    }
}

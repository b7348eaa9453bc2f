//! Context ranking
//!
//! Re-ranks retrieval candidates by a composite of four independent signals:
//! raw similarity, keyword relevance, recency, and metadata-filter match.
//! The weights are configuration with empirically chosen defaults
//! (0.2 / 0.4 / 0.3 / 0.1); nothing here assumes they are optimal.

use argonaut_common::config::RetrievalConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Bonus contributed by each matched keyword, capped at 1.0 total
const KEYWORD_BONUS: f32 = 0.3;

/// A retrieval candidate with its scoring signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    /// Document ID
    pub id: Uuid,

    /// Chunk content
    pub content: String,

    /// Document metadata
    pub metadata: Value,

    /// When the underlying observation was made
    pub source_timestamp: DateTime<Utc>,

    /// Raw embedding similarity (0.0 - 1.0)
    pub similarity: f32,

    /// Keyword relevance (0.0 - 1.0)
    pub relevance: f32,

    /// Metadata filter match ratio (0.0 - 1.0)
    pub metadata_match: f32,

    /// Weighted combination of all signals
    pub composite_score: f32,
}

/// Composite-score ranker
pub struct ContextRanker {
    similarity_weight: f32,
    relevance_weight: f32,
    recency_weight: f32,
    metadata_weight: f32,
}

impl ContextRanker {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            similarity_weight: config.similarity_weight,
            relevance_weight: config.relevance_weight,
            recency_weight: config.recency_weight,
            metadata_weight: config.metadata_weight,
        }
    }

    /// Score and rank candidates in place, best first.
    ///
    /// The sort is stable, so equal composite scores keep their input order
    /// and re-ranking an already-ranked list is a no-op.
    pub fn rank(
        &self,
        candidates: &mut Vec<RetrievalCandidate>,
        keywords: &[String],
        filters: Option<&serde_json::Map<String, Value>>,
        now: DateTime<Utc>,
    ) {
        for candidate in candidates.iter_mut() {
            candidate.relevance = keyword_relevance(&candidate.content, keywords);
            candidate.metadata_match = metadata_match_ratio(&candidate.metadata, filters);

            let recency = recency_score(candidate.source_timestamp, now);

            candidate.composite_score = self.similarity_weight * candidate.similarity
                + self.relevance_weight * candidate.relevance
                + self.recency_weight * recency
                + self.metadata_weight * candidate.metadata_match;
        }

        candidates.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// Keyword-in-content bonus, capped
fn keyword_relevance(content: &str, keywords: &[String]) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let lower = content.to_lowercase();
    let hits = keywords
        .iter()
        .filter(|kw| lower.contains(kw.to_lowercase().as_str()))
        .count();
    (hits as f32 * KEYWORD_BONUS).min(1.0)
}

/// Step-function freshness score
fn recency_score(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age_days = (now - timestamp).num_days();
    match age_days {
        d if d <= 1 => 1.0,
        d if d <= 7 => 0.8,
        d if d <= 30 => 0.6,
        d if d <= 90 => 0.4,
        _ => 0.2,
    }
}

/// Fraction of supplied filters the metadata satisfies; 1.0 with no filters
fn metadata_match_ratio(
    metadata: &Value,
    filters: Option<&serde_json::Map<String, Value>>,
) -> f32 {
    let Some(filters) = filters else {
        return 1.0;
    };
    if filters.is_empty() {
        return 1.0;
    }

    let matched = filters
        .iter()
        .filter(|(key, expected)| metadata.get(key.as_str()) == Some(expected))
        .count();

    matched as f32 / filters.len() as f32
}

/// Hard metadata filter: candidates must satisfy every supplied filter
pub fn passes_filters(
    metadata: &Value,
    filters: Option<&serde_json::Map<String, Value>>,
) -> bool {
    match filters {
        None => true,
        Some(filters) => filters
            .iter()
            .all(|(key, expected)| metadata.get(key.as_str()) == Some(expected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(id: u128, content: &str, similarity: f32, age_days: i64, now: DateTime<Utc>) -> RetrievalCandidate {
        RetrievalCandidate {
            id: Uuid::from_u128(id),
            content: content.to_string(),
            metadata: serde_json::json!({}),
            source_timestamp: now - Duration::days(age_days),
            similarity,
            relevance: 0.0,
            metadata_match: 0.0,
            composite_score: 0.0,
        }
    }

    fn ranker() -> ContextRanker {
        ContextRanker::new(&RetrievalConfig::default())
    }

    #[test]
    fn test_composite_beats_raw_similarity() {
        let now = Utc::now();
        // 0.9 similarity but no keyword overlap, vs 0.7 similarity with two
        // keyword matches; equal recency
        let mut candidates = vec![
            candidate(1, "unrelated discussion of currents", 0.9, 3, now),
            candidate(2, "salinity and temperature profile analysis", 0.7, 3, now),
        ];
        let keywords = vec!["salinity".to_string(), "temperature".to_string()];

        ranker().rank(&mut candidates, &keywords, None, now);

        assert_eq!(candidates[0].id, Uuid::from_u128(2));
        assert!(candidates[0].composite_score > candidates[1].composite_score);
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let now = Utc::now();
        let mut candidates = vec![
            candidate(1, "salinity profile", 0.4, 2, now),
            candidate(2, "temperature profile", 0.8, 40, now),
            candidate(3, "oxygen minimum zone", 0.6, 10, now),
        ];
        let keywords = vec!["profile".to_string()];

        ranker().rank(&mut candidates, &keywords, None, now);
        let first_order: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();

        ranker().rank(&mut candidates, &keywords, None, now);
        let second_order: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();

        assert_eq!(first_order, second_order);
    }

    #[test]
    fn test_stable_on_ties() {
        let now = Utc::now();
        let mut candidates = vec![
            candidate(1, "same text", 0.5, 2, now),
            candidate(2, "same text", 0.5, 2, now),
        ];

        ranker().rank(&mut candidates, &[], None, now);
        assert_eq!(candidates[0].id, Uuid::from_u128(1));
        assert_eq!(candidates[1].id, Uuid::from_u128(2));
    }

    #[test]
    fn test_recency_steps() {
        let now = Utc::now();
        assert_eq!(recency_score(now, now), 1.0);
        assert_eq!(recency_score(now - Duration::days(5), now), 0.8);
        assert_eq!(recency_score(now - Duration::days(20), now), 0.6);
        assert_eq!(recency_score(now - Duration::days(60), now), 0.4);
        assert_eq!(recency_score(now - Duration::days(365), now), 0.2);
    }

    #[test]
    fn test_metadata_filters() {
        let metadata = serde_json::json!({"region": "arabian sea", "parameter": "salinity"});
        let mut filters = serde_json::Map::new();
        filters.insert("region".to_string(), serde_json::json!("arabian sea"));

        assert!(passes_filters(&metadata, Some(&filters)));
        assert_eq!(metadata_match_ratio(&metadata, Some(&filters)), 1.0);

        filters.insert("parameter".to_string(), serde_json::json!("oxygen"));
        assert!(!passes_filters(&metadata, Some(&filters)));
        assert_eq!(metadata_match_ratio(&metadata, Some(&filters)), 0.5);
    }

    #[test]
    fn test_keyword_bonus_capped() {
        let keywords: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(keyword_relevance("a b c d e", &keywords), 1.0);
    }
}

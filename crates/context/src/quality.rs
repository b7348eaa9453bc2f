//! Answer quality scoring
//!
//! Five independent sub-scores, each in [0, 1], combined as an unweighted
//! mean. The score is advisory metadata returned alongside the answer; it is
//! never a basis for rejecting one.

use crate::factcheck::FactCheckReport;
use serde::{Deserialize, Serialize};

/// Scientific vocabulary used for the density sub-score
const SCIENTIFIC_TERMS: &[&str] = &[
    "salinity",
    "temperature",
    "pressure",
    "oxygen",
    "profile",
    "float",
    "measurement",
    "observation",
    "thermocline",
    "halocline",
    "gradient",
    "anomaly",
    "mean",
    "dbar",
    "psu",
];

/// Penalty per fact-check flag on the accuracy sub-score
const FLAG_PENALTY: f32 = 0.2;

/// Quality report for a generated answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Query-term overlap with the answer
    pub relevance: f32,

    /// Derived from the fact-check flags
    pub accuracy: f32,

    /// Length-bucket completeness
    pub completeness: f32,

    /// Sentence-length clarity
    pub clarity: f32,

    /// Scientific vocabulary density
    pub vocabulary: f32,

    /// Unweighted mean of the five sub-scores
    pub overall: f32,
}

/// Quality scorer
#[derive(Default)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score an answer against the originating query and its fact-check
    pub fn score(&self, query: &str, answer: &str, fact_check: &FactCheckReport) -> QualityReport {
        let relevance = relevance_score(query, answer);
        let accuracy = (1.0 - FLAG_PENALTY * fact_check.flag_count() as f32).max(0.0);
        let completeness = completeness_score(answer);
        let clarity = clarity_score(answer);
        let vocabulary = vocabulary_score(answer);

        let overall = (relevance + accuracy + completeness + clarity + vocabulary) / 5.0;

        QualityReport {
            relevance,
            accuracy,
            completeness,
            clarity,
            vocabulary,
            overall,
        }
    }
}

/// Fraction of content-bearing query words that appear in the answer
fn relevance_score(query: &str, answer: &str) -> f32 {
    let answer_lower = answer.to_lowercase();
    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() > 3)
        .collect();

    if terms.is_empty() {
        return 0.5;
    }

    let hits = terms.iter().filter(|t| answer_lower.contains(t.as_str())).count();
    hits as f32 / terms.len() as f32
}

/// Length-bucket completeness
fn completeness_score(answer: &str) -> f32 {
    match answer.chars().count() {
        0..=49 => 0.2,
        50..=149 => 0.5,
        150..=399 => 0.8,
        _ => 1.0,
    }
}

/// Mean-sentence-length clarity: mid-length sentences read best
fn clarity_score(answer: &str) -> f32 {
    let sentences: Vec<&str> = answer
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        return 0.2;
    }

    let total_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    let mean = total_words as f32 / sentences.len() as f32;

    match mean {
        m if (8.0..=25.0).contains(&m) => 1.0,
        m if (4.0..40.0).contains(&m) => 0.7,
        _ => 0.4,
    }
}

/// Scientific vocabulary density, scaled so a handful of terms saturates
fn vocabulary_score(answer: &str) -> f32 {
    let lower = answer.to_lowercase();
    let hits = SCIENTIFIC_TERMS
        .iter()
        .filter(|term| lower.contains(**term))
        .count();
    (hits as f32 / 4.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_bounded() {
        let scorer = QualityScorer::new();
        let report = scorer.score(
            "What was the salinity in October 2024?",
            "The mean salinity observed by floats in October 2024 was 35.1 psu, based on 42 profiles.",
            &FactCheckReport::default(),
        );

        for score in [
            report.relevance,
            report.accuracy,
            report.completeness,
            report.clarity,
            report.vocabulary,
            report.overall,
        ] {
            assert!((0.0..=1.0).contains(&score));
        }
        assert!(report.relevance > 0.5);
    }

    #[test]
    fn test_overall_is_unweighted_mean() {
        let scorer = QualityScorer::new();
        let report = scorer.score("salinity", "salinity measurement profile", &FactCheckReport::default());

        let mean = (report.relevance
            + report.accuracy
            + report.completeness
            + report.clarity
            + report.vocabulary)
            / 5.0;
        assert!((report.overall - mean).abs() < 1e-6);
    }

    #[test]
    fn test_flags_lower_accuracy() {
        let scorer = QualityScorer::new();
        let mut fact_check = FactCheckReport::default();
        fact_check.numeric_flags.push("999 out of range".to_string());
        fact_check
            .contradiction_flags
            .push("warm and cold".to_string());

        let report = scorer.score("q", "a", &fact_check);
        assert!((report.accuracy - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_short_answer_scores_low_completeness() {
        let scorer = QualityScorer::new();
        let report = scorer.score("query", "No.", &FactCheckReport::default());
        assert_eq!(report.completeness, 0.2);
    }
}

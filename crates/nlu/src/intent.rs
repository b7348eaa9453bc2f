//! Intent classification
//!
//! Scores a fixed intent taxonomy by combining regex-pattern hits (0.8,
//! capped) with keyword-density scores (up to 0.6). The highest-scoring
//! intent wins; `UNKNOWN` when no signal fires.

use crate::types::Intent;
use regex_lite::Regex;

/// Pattern-hit weight; one or more hits contribute exactly this much
const PATTERN_WEIGHT: f32 = 0.8;

/// Maximum contribution of keyword density
const KEYWORD_WEIGHT: f32 = 0.6;

struct IntentRule {
    intent: Intent,
    patterns: Vec<Regex>,
    keywords: &'static [&'static str],
}

/// Intent classifier over query text
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        let rules = vec![
            IntentRule {
                intent: Intent::AnalyzeTemperature,
                patterns: patterns(&[
                    r"(?i)\b(temperature|thermal|sst)\b",
                    r"(?i)\bhow (warm|cold|hot)\b",
                ]),
                keywords: &["temperature", "warm", "cold", "heat", "thermal", "degrees", "sst"],
            },
            IntentRule {
                intent: Intent::AnalyzeSalinity,
                patterns: patterns(&[r"(?i)\b(salinity|psal)\b", r"(?i)\bhow (salty|fresh)\b"]),
                keywords: &["salinity", "salt", "salty", "psu", "halocline", "freshwater"],
            },
            IntentRule {
                intent: Intent::AnalyzeOxygen,
                patterns: patterns(&[r"(?i)\b(oxygen|doxy|hypoxi\w*)\b"]),
                keywords: &["oxygen", "doxy", "hypoxia", "bgc", "biogeochemical"],
            },
            IntentRule {
                intent: Intent::CompareData,
                patterns: patterns(&[
                    r"(?i)\b(compare|versus|vs\.?)\b",
                    r"(?i)\bdifference between\b",
                    r"(?i)\bchange (from|between|since)\b",
                ]),
                keywords: &["compare", "comparison", "versus", "difference", "between", "change"],
            },
            IntentRule {
                intent: Intent::MapFloats,
                patterns: patterns(&[
                    r"(?i)\bwhere (are|is|were)\b",
                    r"(?i)\b(trajectory|trajectories)\b",
                    r"(?i)\bmap\b",
                ]),
                keywords: &["where", "map", "location", "trajectory", "position", "nearby", "near"],
            },
            IntentRule {
                intent: Intent::FloatStatus,
                patterns: patterns(&[
                    r"(?i)\bfloat\s+\d{7}\b",
                    r"(?i)\b(status|health) of\b",
                ]),
                keywords: &["status", "active", "platform", "cycle", "battery", "deployed"],
            },
            IntentRule {
                intent: Intent::DataAvailability,
                patterns: patterns(&[
                    r"(?i)\b(is|are) there (any )?(data|profiles|measurements)\b",
                    r"(?i)\bhow many (profiles|floats|measurements)\b",
                    r"(?i)\b(data )?coverage\b",
                ]),
                keywords: &["available", "availability", "coverage", "exist", "many", "count"],
            },
            IntentRule {
                intent: Intent::Summarize,
                patterns: patterns(&[
                    r"(?i)\b(average|mean|median)\b",
                    r"(?i)\b(summary|summarize|overview)\b",
                    r"(?i)\b(trend|statistics)\b",
                ]),
                keywords: &["average", "mean", "summary", "statistics", "trend", "aggregate", "overall"],
            },
        ];

        Self { rules }
    }

    /// Classify the query; returns the winning intent and its confidence
    pub fn classify(&self, text: &str) -> (Intent, f32) {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        let mut best = (Intent::Unknown, 0.0_f32);

        for rule in &self.rules {
            let pattern_score = if rule.patterns.iter().any(|p| p.is_match(text)) {
                PATTERN_WEIGHT
            } else {
                0.0
            };

            let hits = rule
                .keywords
                .iter()
                .filter(|kw| words.iter().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == **kw))
                .count();
            let keyword_score = if rule.keywords.is_empty() {
                0.0
            } else {
                (hits as f32 / rule.keywords.len() as f32) * KEYWORD_WEIGHT
            };

            let score = (pattern_score + keyword_score).min(1.0);
            if score > best.1 {
                best = (rule.intent, score);
            }
        }

        best
    }
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("intent pattern"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> (Intent, f32) {
        IntentClassifier::new().classify(text)
    }

    #[test]
    fn test_temperature_intent() {
        let (intent, confidence) = classify("show me recent float temperature near the Arabian Sea");
        assert_eq!(intent, Intent::AnalyzeTemperature);
        assert!(confidence >= 0.8);
    }

    #[test]
    fn test_salinity_intent() {
        let (intent, _) = classify("What was the salinity in October 2024?");
        assert_eq!(intent, Intent::AnalyzeSalinity);
    }

    #[test]
    fn test_compare_intent() {
        let (intent, _) = classify("compare salinity between 2023 and 2024");
        // Both salinity and compare fire a 0.8 pattern; compare has two
        // keyword hits against a six-word list, salinity one of six
        assert!(matches!(intent, Intent::CompareData | Intent::AnalyzeSalinity));
    }

    #[test]
    fn test_map_intent() {
        let (intent, _) = classify("where are the active floats near the equator?");
        assert_eq!(intent, Intent::MapFloats);
    }

    #[test]
    fn test_unknown_when_no_signal() {
        let (intent, confidence) = classify("hello there");
        assert_eq!(intent, Intent::Unknown);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_confidence_bounded() {
        let (_, confidence) =
            classify("average mean temperature trend summary statistics overview");
        assert!(confidence <= 1.0);
    }
}

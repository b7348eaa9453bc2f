//! Entity extraction
//!
//! Layered approach:
//! 1. Domain regex patterns (float identifiers, coordinates, dates, depth
//!    ranges, data modes, relative time)
//! 2. Vocabulary lookup (measurements, basins, regions, quality terms)
//! 3. Capitalized-sequence fallback for place names
//!
//! Overlapping spans are resolved once at the end: higher confidence wins,
//! ties go to the earlier start. The surviving list is ordered by span start
//! and immutable downstream.

use crate::types::{Entity, EntityLabel, EntitySource};
use crate::vocab;
use regex_lite::Regex;

/// One domain pattern rule
struct PatternRule {
    label: EntityLabel,
    regex: Regex,
    confidence: f32,
    normalizer: Normalizer,
}

#[derive(Clone, Copy)]
enum Normalizer {
    /// Keep the matched text lowercased
    Verbatim,
    /// Month name + year -> "YYYY-MM"
    MonthYear,
    /// Signed decimal pair -> "lat,lon"
    Coordinate,
    /// "min to max unit" -> "min:max"
    DepthRange,
    /// Data-mode word -> single-letter Argo code
    DataMode,
}

/// Entity extractor over query text
pub struct EntityExtractor {
    patterns: Vec<PatternRule>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    pub fn new() -> Self {
        let patterns = vec![
            PatternRule {
                label: EntityLabel::FloatId,
                regex: Regex::new(r"\b[1-9]\d{6}\b").expect("float id pattern"),
                confidence: 0.95,
                normalizer: Normalizer::Verbatim,
            },
            PatternRule {
                label: EntityLabel::Coordinate,
                regex: Regex::new(r"\b(-?\d{1,2}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)\b")
                    .expect("coordinate pattern"),
                confidence: 0.85,
                normalizer: Normalizer::Coordinate,
            },
            PatternRule {
                label: EntityLabel::Date,
                regex: Regex::new(r"\b\d{4}-\d{2}(?:-\d{2})?\b").expect("iso date pattern"),
                confidence: 0.9,
                normalizer: Normalizer::Verbatim,
            },
            PatternRule {
                label: EntityLabel::Date,
                regex: Regex::new(
                    r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{4})\b",
                )
                .expect("month-year pattern"),
                confidence: 0.9,
                normalizer: Normalizer::MonthYear,
            },
            PatternRule {
                label: EntityLabel::Date,
                regex: Regex::new(r"\b(?:19|20)\d{2}\b").expect("year pattern"),
                confidence: 0.7,
                normalizer: Normalizer::Verbatim,
            },
            PatternRule {
                label: EntityLabel::DepthRange,
                regex: Regex::new(
                    r"(?i)\b(\d+(?:\.\d+)?)\s*(?:m|meters|metres|dbar)?\s*(?:to|-)\s*(\d+(?:\.\d+)?)\s*(?:m|meters|metres|dbar)\b",
                )
                .expect("depth range pattern"),
                confidence: 0.85,
                normalizer: Normalizer::DepthRange,
            },
            PatternRule {
                label: EntityLabel::DataMode,
                regex: Regex::new(r"(?i)\b(real[- ]?time|adjusted|delayed(?:[- ]mode)?)\b")
                    .expect("data mode pattern"),
                confidence: 0.8,
                normalizer: Normalizer::DataMode,
            },
            PatternRule {
                label: EntityLabel::TimeExpression,
                regex: Regex::new(
                    r"(?i)\b(recent(?:ly)?|latest|today|yesterday|this (?:week|month|year)|(?:last|past)\s+\d+\s+(?:days?|weeks?|months?)|last (?:week|month|year))\b",
                )
                .expect("relative time pattern"),
                confidence: 0.85,
                normalizer: Normalizer::Verbatim,
            },
        ];

        Self { patterns }
    }

    /// Extract a non-overlapping, start-ordered entity list
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        let mut candidates = Vec::new();

        self.collect_pattern_entities(text, &mut candidates);
        self.collect_vocabulary_entities(text, &mut candidates);
        self.collect_ner_entities(text, &mut candidates);

        resolve_overlaps(candidates)
    }

    fn collect_pattern_entities(&self, text: &str, out: &mut Vec<Entity>) {
        for rule in &self.patterns {
            for caps in rule.regex.captures_iter(text) {
                let whole = caps.get(0).expect("group 0 always present");
                let normalized = normalize(&caps, rule.normalizer);

                out.push(Entity {
                    text: whole.as_str().to_string(),
                    label: rule.label,
                    start: whole.start(),
                    end: whole.end(),
                    confidence: rule.confidence,
                    normalized_value: normalized,
                    source: EntitySource::Pattern,
                });
            }
        }
    }

    /// Spans are taken from the lowercased text so offsets always align with
    /// the string that was searched
    fn collect_vocabulary_entities(&self, text: &str, out: &mut Vec<Entity>) {
        let lower = text.to_lowercase();

        for &basin in vocab::OCEAN_BASINS {
            find_phrase(&lower, basin, |start, end| {
                out.push(Entity {
                    text: lower[start..end].to_string(),
                    label: EntityLabel::Basin,
                    start,
                    end,
                    confidence: 0.85,
                    normalized_value: Some(basin.to_string()),
                    source: EntitySource::Vocabulary,
                });
            });
        }

        for &region in vocab::NAMED_REGIONS {
            find_phrase(&lower, region, |start, end| {
                out.push(Entity {
                    text: lower[start..end].to_string(),
                    label: EntityLabel::Region,
                    start,
                    end,
                    confidence: 0.85,
                    normalized_value: Some(region.to_string()),
                    source: EntitySource::Vocabulary,
                });
            });
        }

        for (surface, canonical) in vocab::MEASUREMENTS {
            find_phrase(&lower, surface, |start, end| {
                out.push(Entity {
                    text: lower[start..end].to_string(),
                    label: EntityLabel::Measurement,
                    start,
                    end,
                    confidence: 0.8,
                    normalized_value: Some((*canonical).to_string()),
                    source: EntitySource::Vocabulary,
                });
            });
        }

        for &term in vocab::QUALITY_TERMS {
            find_phrase(&lower, term, |start, end| {
                out.push(Entity {
                    text: lower[start..end].to_string(),
                    label: EntityLabel::QualityFlag,
                    start,
                    end,
                    confidence: 0.75,
                    normalized_value: Some(term.to_string()),
                    source: EntitySource::Vocabulary,
                });
            });
        }
    }

    /// Capitalized multi-word sequences that look like place names
    fn collect_ner_entities(&self, text: &str, out: &mut Vec<Entity>) {
        let mut run: Vec<(usize, &str)> = Vec::new();

        let mut flush = |run: &mut Vec<(usize, &str)>, out: &mut Vec<Entity>| {
            if run.len() >= 2 {
                let start = run[0].0;
                let last = run[run.len() - 1];
                let end = last.0 + last.1.len();
                out.push(Entity {
                    text: text[start..end].to_string(),
                    label: EntityLabel::Location,
                    start,
                    end,
                    confidence: 0.5,
                    normalized_value: Some(text[start..end].to_lowercase()),
                    source: EntitySource::Ner,
                });
            }
            run.clear();
        };

        for (offset, word) in split_words(text) {
            let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase())
                && word.len() > 2
                && !vocab::is_stop_word(word);
            if capitalized {
                run.push((offset, word));
            } else {
                flush(&mut run, out);
            }
        }
        flush(&mut run, out);
    }
}

fn normalize(caps: &regex_lite::Captures<'_>, normalizer: Normalizer) -> Option<String> {
    let whole = caps.get(0)?.as_str();
    match normalizer {
        Normalizer::Verbatim => Some(whole.to_lowercase()),
        Normalizer::MonthYear => {
            let month = month_number(caps.get(1)?.as_str())?;
            let year = caps.get(2)?.as_str();
            Some(format!("{}-{:02}", year, month))
        }
        Normalizer::Coordinate => {
            let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
            let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return None;
            }
            Some(format!("{},{}", lat, lon))
        }
        Normalizer::DepthRange => {
            let min = caps.get(1)?.as_str();
            let max = caps.get(2)?.as_str();
            Some(format!("{}:{}", min, max))
        }
        Normalizer::DataMode => {
            let word = whole.to_lowercase();
            let code = if word.starts_with("real") {
                'R'
            } else if word.starts_with("adjusted") {
                'A'
            } else {
                'D'
            };
            Some(code.to_string())
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    MONTHS
        .iter()
        .position(|m| *m == name.to_lowercase())
        .map(|i| i as u32 + 1)
}

/// Find whole-word occurrences of `phrase` in lowercased `haystack`
fn find_phrase(haystack: &str, phrase: &str, mut on_match: impl FnMut(usize, usize)) {
    for (start, matched) in haystack.match_indices(phrase) {
        let end = start + matched.len();

        let before_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());

        if before_ok && after_ok {
            on_match(start, end);
        }
    }
}

/// Word tokens with byte offsets
fn split_words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            words.push((s, &text[s..i]));
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

/// Drop overlapping entities: higher confidence wins, ties go to the earlier
/// start; survivors are returned ordered by span start.
fn resolve_overlaps(mut candidates: Vec<Entity>) -> Vec<Entity> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.start.cmp(&b.start))
            // Prefer the longer span among equal-confidence same-start spans
            .then_with(|| b.end.cmp(&a.end))
    });

    let mut kept: Vec<Entity> = Vec::new();
    for candidate in candidates {
        if !kept.iter().any(|k| k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }

    kept.sort_by_key(|e| e.start);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<Entity> {
        EntityExtractor::new().extract(text)
    }

    #[test]
    fn test_float_id() {
        let entities = extract("status of float 2902746 please");
        let float = entities
            .iter()
            .find(|e| e.label == EntityLabel::FloatId)
            .unwrap();
        assert_eq!(float.text, "2902746");
        assert_eq!(float.normalized_value.as_deref(), Some("2902746"));
    }

    #[test]
    fn test_month_year_beats_bare_year() {
        let entities = extract("salinity in October 2024");
        let dates: Vec<_> = entities
            .iter()
            .filter(|e| e.label == EntityLabel::Date)
            .collect();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].normalized_value.as_deref(), Some("2024-10"));
    }

    #[test]
    fn test_region_and_measurement() {
        let entities = extract("temperature near the Arabian Sea");
        assert!(entities
            .iter()
            .any(|e| e.label == EntityLabel::Region
                && e.normalized_value.as_deref() == Some("arabian sea")));
        assert!(entities
            .iter()
            .any(|e| e.label == EntityLabel::Measurement
                && e.normalized_value.as_deref() == Some("temperature")));
    }

    #[test]
    fn test_no_overlaps_survive() {
        // "sea surface temperature" overlaps "temperature"; "October 2024"
        // overlaps the bare year
        let entities = extract("sea surface temperature trends for October 2024 in the Pacific");
        for (i, a) in entities.iter().enumerate() {
            for b in entities.iter().skip(i + 1) {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_longest_measurement_wins() {
        let entities = extract("sea surface temperature in the tropics");
        let m: Vec<_> = entities
            .iter()
            .filter(|e| e.label == EntityLabel::Measurement)
            .collect();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].text.to_lowercase(), "sea surface temperature");
    }

    #[test]
    fn test_depth_range() {
        let entities = extract("oxygen between 100 to 500 dbar");
        let depth = entities
            .iter()
            .find(|e| e.label == EntityLabel::DepthRange)
            .unwrap();
        assert_eq!(depth.normalized_value.as_deref(), Some("100:500"));
    }

    #[test]
    fn test_relative_time_expression() {
        let entities = extract("show me recent profiles from the last 30 days");
        let times: Vec<_> = entities
            .iter()
            .filter(|e| e.label == EntityLabel::TimeExpression)
            .collect();
        assert!(times.len() >= 2);
    }

    #[test]
    fn test_coordinate_pair() {
        let entities = extract("profiles near 15.5, 68.2 last month");
        let coord = entities
            .iter()
            .find(|e| e.label == EntityLabel::Coordinate)
            .unwrap();
        assert_eq!(coord.normalized_value.as_deref(), Some("15.5,68.2"));
    }
}

//! Temporal/semantic router
//!
//! Decides, independently of full query understanding, whether a question
//! must be answered by exact structured filtering (temporal path) or by
//! approximate semantic search. Embeddings cluster by topic, not by date, so
//! any calendar or recency expression forces the structured path.

use chrono::{DateTime, Months, NaiveDate, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Routing decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Exact calendar filtering via the structured path
    Temporal,
    /// Topical retrieval via the vector index
    Semantic,
}

/// Extracted calendar information for a temporal query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporalInfo {
    /// Absolute year, when present
    pub year: Option<i32>,

    /// Month (1-12), when present alongside a year
    pub month: Option<u32>,

    /// Whether a recency word triggered the temporal route
    pub is_recent: bool,

    /// Half-open date range [start, end)
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Calendar/recency detector
pub struct TemporalDetector {
    month_year: Regex,
    iso_month: Regex,
    year: Regex,
    recency: Regex,
    recency_window_days: i64,
}

impl TemporalDetector {
    /// Create a detector with the given trailing recency window
    pub fn new(recency_window_days: i64) -> Self {
        Self {
            month_year: Regex::new(
                r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+((?:19|20)\d{2})\b",
            )
            .expect("month-year pattern"),
            iso_month: Regex::new(r"\b((?:19|20)\d{2})-(0[1-9]|1[0-2])\b").expect("iso month pattern"),
            year: Regex::new(r"\b((?:19|20)\d{2})\b").expect("year pattern"),
            recency: Regex::new(
                r"(?i)\b(recent(?:ly)?|latest|today|yesterday|this (?:week|month|year)|(?:last|past)\s+\d+\s+(?:days?|weeks?|months?)|last (?:week|month|year))\b",
            )
            .expect("recency pattern"),
            recency_window_days,
        }
    }

    /// Classify the routing path for a query
    pub fn route(&self, text: &str) -> RouteKind {
        if self.year.is_match(text) || self.iso_month.is_match(text) || self.recency.is_match(text)
        {
            RouteKind::Temporal
        } else {
            RouteKind::Semantic
        }
    }

    /// Extract calendar information relative to `now` (request time)
    pub fn extract_temporal_info(&self, text: &str, now: DateTime<Utc>) -> TemporalInfo {
        let today = now.date_naive();

        // Month + year, either spelled out or ISO-like
        if let Some(caps) = self.month_year.captures(text) {
            let month = month_number(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
            let year: Option<i32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
            if let (Some(month), Some(year)) = (month, year) {
                return TemporalInfo {
                    year: Some(year),
                    month: Some(month),
                    is_recent: false,
                    date_range: month_range(year, month),
                };
            }
        }

        if let Some(caps) = self.iso_month.captures(text) {
            let year: Option<i32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let month: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
            if let (Some(year), Some(month)) = (year, month) {
                return TemporalInfo {
                    year: Some(year),
                    month: Some(month),
                    is_recent: false,
                    date_range: month_range(year, month),
                };
            }
        }

        // Bare year spans the whole calendar year
        if let Some(caps) = self.year.captures(text) {
            if let Some(year) = caps.get(1).and_then(|m| m.as_str().parse::<i32>().ok()) {
                let range = NaiveDate::from_ymd_opt(year, 1, 1)
                    .zip(NaiveDate::from_ymd_opt(year + 1, 1, 1));
                return TemporalInfo {
                    year: Some(year),
                    month: None,
                    is_recent: false,
                    date_range: range,
                };
            }
        }

        // Recency words without an explicit date: trailing window from now
        if self.recency.is_match(text) {
            let start = today - chrono::Duration::days(self.recency_window_days);
            let end = today + chrono::Duration::days(1);
            return TemporalInfo {
                year: None,
                month: None,
                is_recent: true,
                date_range: Some((start, end)),
            };
        }

        TemporalInfo {
            year: None,
            month: None,
            is_recent: false,
            date_range: None,
        }
    }
}

/// Half-open range covering one calendar month
fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?;
    Some((start, end))
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

/// Render a temporal info as the human-readable period it covers
pub fn describe_period(info: &TemporalInfo) -> String {
    match (info.year, info.month, info.is_recent) {
        (Some(year), Some(month), _) => format!("{}-{:02}", year, month),
        (Some(year), None, _) => year.to_string(),
        (None, _, true) => "the recent period".to_string(),
        _ => info
            .date_range
            .map(|(start, end)| format!("{} to {}", start, end))
            .unwrap_or_else(|| "the requested period".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detector() -> TemporalDetector {
        TemporalDetector::new(180)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_year_token_routes_temporal() {
        assert_eq!(detector().route("salinity anomalies in 2024"), RouteKind::Temporal);
        assert_eq!(detector().route("what happened in 1998"), RouteKind::Temporal);
    }

    #[test]
    fn test_recency_routes_temporal() {
        let d = detector();
        assert_eq!(d.route("show me recent float temperature near the Arabian Sea"), RouteKind::Temporal);
        assert_eq!(d.route("latest profiles please"), RouteKind::Temporal);
        assert_eq!(d.route("data from the last 30 days"), RouteKind::Temporal);
    }

    #[test]
    fn test_topical_routes_semantic() {
        let d = detector();
        assert_eq!(d.route("how does salinity vary with depth"), RouteKind::Semantic);
        assert_eq!(d.route("explain the thermocline"), RouteKind::Semantic);
    }

    #[test]
    fn test_october_2024_scenario() {
        let info = detector().extract_temporal_info("What was the salinity in October 2024?", fixed_now());
        assert_eq!(info.year, Some(2024));
        assert_eq!(info.month, Some(10));
        assert!(!info.is_recent);
        assert_eq!(
            info.date_range,
            Some((
                NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()
            ))
        );
    }

    #[test]
    fn test_iso_month_token() {
        let info = detector().extract_temporal_info("profiles from 2023-07", fixed_now());
        assert_eq!(info.year, Some(2023));
        assert_eq!(info.month, Some(7));
    }

    #[test]
    fn test_bare_year_spans_year() {
        let info = detector().extract_temporal_info("temperature in 2022", fixed_now());
        assert_eq!(
            info.date_range,
            Some((
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
            ))
        );
    }

    #[test]
    fn test_recency_defaults_to_trailing_window() {
        let info = detector().extract_temporal_info("recent oxygen data", fixed_now());
        assert!(info.is_recent);
        let (start, end) = info.date_range.unwrap();
        assert_eq!(end - start, chrono::Duration::days(181));
        assert_eq!(start, fixed_now().date_naive() - chrono::Duration::days(180));
    }

    #[test]
    fn test_describe_period() {
        let d = detector();
        let info = d.extract_temporal_info("October 2024", fixed_now());
        assert_eq!(describe_period(&info), "2024-10");

        let info = d.extract_temporal_info("in 2022", fixed_now());
        assert_eq!(describe_period(&info), "2022");

        let info = d.extract_temporal_info("recent data", fixed_now());
        assert_eq!(describe_period(&info), "the recent period");
    }
}

//! Answer types
//!
//! One tagged union with exhaustive matching replaces per-backend response
//! shapes: semantic answers, temporal answers, the legitimate "no data for
//! that period" outcome, and pipeline failures all flow through [`Answer`].

use crate::quality::QualityReport;
use argonaut_common::errors::ErrorDetails;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The pipeline's final product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum Answer {
    /// Semantic-path answer grounded in ranked passages
    Standard(StandardAnswer),

    /// Structured-path answer grounded in relational rows
    Temporal(TemporalAnswer),

    /// Temporal query that matched zero rows; a fact, not a failure
    NoData(NoDataAnswer),

    /// Pipeline failure; polite apology with confidence 0
    Error(ErrorAnswer),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardAnswer {
    /// Generated prose
    pub text: String,

    /// Confidence (0.0 - 1.0)
    pub confidence: f32,

    /// IDs of the passages used as evidence, in rank order
    pub source_ids: Vec<Uuid>,

    /// Advisory quality report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalAnswer {
    /// Generated prose
    pub text: String,

    /// Confidence (0.0 - 1.0)
    pub confidence: f32,

    /// The period the query covered, human-readable
    pub period: String,

    /// Structured rows backing the answer
    pub row_count: usize,

    /// Advisory quality report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoDataAnswer {
    /// User-facing statement of the absence
    pub text: String,

    /// The period that had no data
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorAnswer {
    /// Templated apology
    pub text: String,

    /// Always 0.0
    pub confidence: f32,

    /// Machine-readable failure details
    pub details: ErrorDetails,
}

impl Answer {
    /// Build the no-data outcome for a period
    pub fn no_data(period: &str) -> Self {
        Answer::NoData(NoDataAnswer {
            text: format!("No float data was found for {}.", period),
            period: period.to_string(),
        })
    }

    /// Build the degraded failure outcome
    pub fn degraded(error: &argonaut_common::AppError) -> Self {
        Answer::Error(ErrorAnswer {
            text: "I'm sorry, I couldn't answer that right now. Please try again in a moment."
                .to_string(),
            confidence: 0.0,
            details: ErrorDetails::from(error),
        })
    }

    /// The user-facing text for any outcome
    pub fn text(&self) -> &str {
        match self {
            Answer::Standard(a) => &a.text,
            Answer::Temporal(a) => &a.text,
            Answer::NoData(a) => &a.text,
            Answer::Error(a) => &a.text,
        }
    }

    /// Confidence for any outcome; no-data is a confident fact
    pub fn confidence(&self) -> f32 {
        match self {
            Answer::Standard(a) => a.confidence,
            Answer::Temporal(a) => a.confidence,
            Answer::NoData(_) => 1.0,
            Answer::Error(_) => 0.0,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Answer::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argonaut_common::AppError;

    #[test]
    fn test_no_data_is_not_an_error() {
        let answer = Answer::no_data("2024-10");
        assert!(!answer.is_error());
        assert!(answer.text().contains("2024-10"));
        assert_eq!(answer.confidence(), 1.0);
    }

    #[test]
    fn test_error_answer_shape() {
        let answer = Answer::degraded(&AppError::AiTimeout {
            service: "generation".into(),
            timeout_ms: 30_000,
        });
        assert!(answer.is_error());
        assert_eq!(answer.confidence(), 0.0);

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["query_type"], "error");
    }

    #[test]
    fn test_temporal_tag() {
        let answer = Answer::Temporal(TemporalAnswer {
            text: "mean salinity was 35.1".into(),
            confidence: 0.8,
            period: "2024-10".into(),
            row_count: 12,
            quality: None,
        });
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["query_type"], "temporal");
        assert_eq!(json["row_count"], 12);
    }
}

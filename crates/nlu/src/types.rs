//! Core query-understanding types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query intent classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Temperature analysis (profiles, anomalies, trends)
    AnalyzeTemperature,
    /// Salinity analysis
    AnalyzeSalinity,
    /// Dissolved oxygen / BGC analysis
    AnalyzeOxygen,
    /// Comparing regions, periods, or parameters
    CompareData,
    /// Locating floats or trajectories
    MapFloats,
    /// Status of a specific float
    FloatStatus,
    /// What data exists for a region/period
    DataAvailability,
    /// Aggregates and summaries
    Summarize,
    /// No signal fired
    Unknown,
}

impl Intent {
    /// Intents that are unanswerable without some spatial constraint
    pub fn requires_location(&self) -> bool {
        matches!(self, Intent::MapFloats | Intent::DataAvailability)
    }

    /// Intents that are unanswerable without a time window
    pub fn requires_time_window(&self) -> bool {
        matches!(self, Intent::CompareData)
    }
}

/// Extracted entity: a typed span of the analyzed text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Entity text as it appeared
    pub text: String,

    /// Entity label
    pub label: EntityLabel,

    /// Byte offset of the span start
    pub start: usize,

    /// Byte offset one past the span end
    pub end: usize,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,

    /// Canonical form, when one exists (e.g. "2024-10" for "October 2024")
    pub normalized_value: Option<String>,

    /// Which extraction layer produced this entity
    pub source: EntitySource,
}

impl Entity {
    /// Whether two spans overlap
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Entity labels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityLabel {
    /// Free-form place name
    Location,
    /// Named sea or regional water body
    Region,
    /// Ocean basin
    Basin,
    /// Decimal coordinate pair
    Coordinate,
    /// Calendar date or date-like token
    Date,
    /// Relative time expression
    TimeExpression,
    /// Measured parameter name
    Measurement,
    /// WMO float identifier
    FloatId,
    /// Depth or pressure range
    DepthRange,
    /// Data quality requirement
    QualityFlag,
    /// Argo data mode (real-time/adjusted/delayed)
    DataMode,
}

/// Extraction layer that produced an entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    /// Domain regex pattern
    Pattern,
    /// Vocabulary lookup
    Vocabulary,
    /// Capitalized-sequence fallback
    Ner,
}

/// Geographic bounding box in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Construct a validated box; `None` unless west < east and south < north
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Option<Self> {
        if west < east && south < north {
            Some(Self {
                west,
                south,
                east,
                north,
            })
        } else {
            None
        }
    }

    /// Box around a point, clamped to valid coordinates
    pub fn around(lat: f64, lon: f64, half_width_deg: f64) -> Option<Self> {
        Self::new(
            (lon - half_width_deg).max(-180.0),
            (lat - half_width_deg).max(-90.0),
            (lon + half_width_deg).min(180.0),
            (lat + half_width_deg).min(90.0),
        )
    }
}

/// Spatial constraints derived from a query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpatialScope {
    /// Free-form place names
    pub locations: Vec<String>,

    /// Bounding box, when coordinates were extracted
    pub coordinates: Option<BoundingBox>,

    /// Ocean basins mentioned
    pub ocean_basins: Vec<String>,

    /// Named regions mentioned
    pub regions: Vec<String>,
}

impl SpatialScope {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.coordinates.is_none()
            && self.ocean_basins.is_empty()
            && self.regions.is_empty()
    }
}

/// Temporal constraints derived from a query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TemporalScope {
    /// Window start (inclusive)
    pub start_date: Option<NaiveDate>,

    /// Window end (inclusive)
    pub end_date: Option<NaiveDate>,

    /// Relative expression ("recent", "last 90 days"), verbatim
    pub relative_time: Option<String>,

    /// All time expressions found, verbatim
    pub time_expressions: Vec<String>,
}

impl TemporalScope {
    /// Enforce start <= end by swapping when both are present
    pub fn normalize(mut self) -> Self {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                self.start_date = Some(end);
                self.end_date = Some(start);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.relative_time.is_none()
    }
}

/// Argo data modes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    RealTime,
    Adjusted,
    Delayed,
}

impl DataMode {
    /// Single-letter code used in Argo profile files
    pub fn code(&self) -> char {
        match self {
            DataMode::RealTime => 'R',
            DataMode::Adjusted => 'A',
            DataMode::Delayed => 'D',
        }
    }
}

/// Parameter constraints derived from a query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterScope {
    /// Canonical measurement names
    pub measurements: Vec<String>,

    /// Depth range in meters (min, max)
    pub depth_range: Option<(f64, f64)>,

    /// Quality requirements mentioned
    pub quality_requirements: Vec<String>,

    /// Requested data mode
    pub data_mode: Option<DataMode>,
}

/// Query understanding result: the aggregate the rest of the pipeline reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Original query text, untranslated
    pub original_query: String,

    /// Detected source language (ISO 639-1)
    pub detected_language: String,

    /// Classified intent
    pub intent: Intent,

    /// Overall confidence (0.0 - 1.0)
    pub confidence: f32,

    /// Extracted entities, non-overlapping, ordered by span start
    pub entities: Vec<Entity>,

    /// Spatial scope
    pub spatial: SpatialScope,

    /// Temporal scope
    pub temporal: TemporalScope,

    /// Parameter scope
    pub parameters: ParameterScope,

    /// Whether clarification is suggested before answering
    pub disambiguation_needed: bool,

    /// Up to two templated clarification questions
    pub clarification_questions: Vec<String>,

    /// Diagnostic notes (degradation reasons, translation notes)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl QueryAnalysis {
    /// Degraded result for internal failures; callers check confidence,
    /// not errors
    pub fn degraded(original_query: &str, error_note: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), error_note.to_string());

        Self {
            original_query: original_query.to_string(),
            detected_language: "en".to_string(),
            intent: Intent::Unknown,
            confidence: 0.0,
            entities: Vec::new(),
            spatial: SpatialScope::default(),
            temporal: TemporalScope::default(),
            parameters: ParameterScope::default(),
            disambiguation_needed: true,
            clarification_questions: Vec::new(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_validation() {
        assert!(BoundingBox::new(60.0, 5.0, 75.0, 25.0).is_some());
        assert!(BoundingBox::new(75.0, 5.0, 60.0, 25.0).is_none());
        assert!(BoundingBox::new(60.0, 25.0, 75.0, 5.0).is_none());
    }

    #[test]
    fn test_temporal_scope_normalize_swaps() {
        let scope = TemporalScope {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            relative_time: None,
            time_expressions: vec![],
        }
        .normalize();

        assert!(scope.start_date.unwrap() <= scope.end_date.unwrap());
    }

    #[test]
    fn test_entity_overlap() {
        let a = Entity {
            text: "arabian sea".into(),
            label: EntityLabel::Region,
            start: 10,
            end: 21,
            confidence: 0.9,
            normalized_value: None,
            source: EntitySource::Vocabulary,
        };
        let mut b = a.clone();
        b.start = 18;
        b.end = 25;
        assert!(a.overlaps(&b));

        b.start = 21;
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_intent_serde_format() {
        let json = serde_json::to_string(&Intent::AnalyzeTemperature).unwrap();
        assert_eq!(json, "\"ANALYZE_TEMPERATURE\"");
    }
}

//! Structured query translation
//!
//! Turns a `QueryAnalysis` into a validated, parameterized SQL query over
//! the float observation schema (`floats`, `profiles`, `measurements`).
//! Templates are process-wide, read-only configuration built once at
//! startup; selection prefers the template whose kind matches the scope
//! actually present. Binding drops (and logs) parameters that fail type
//! coercion instead of aborting. Security validation is mandatory and
//! blocking; optimization is best-effort and advisory.

mod builder;
mod security;

pub use builder::{coerce, BoundParameter, BoundValue, ParamKind, SqlBuilder};
pub use security::SecurityValidator;

use argonaut_common::errors::{AppError, Result};
use argonaut_nlu::types::{EntityLabel, Intent, QueryAnalysis};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Shape of a generated query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Row-level profile measurements
    Profile,
    /// Single-row aggregate statistics
    Aggregate,
    /// Bounding-box constrained rows
    Spatial,
    /// Month-bucketed time series
    Timeseries,
    /// Float platform lookup
    FloatLookup,
}

/// A parameterized query template
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub intent: Intent,
    pub kind: QueryKind,
    /// SELECT list; `{m}` expands to the allowlisted measurement column
    pub select: &'static str,
    pub from: &'static str,
    pub joins: &'static [&'static str],
    /// Conditions always applied; `{m}` expands like in `select`
    pub base_conditions: &'static [&'static str],
    pub group_by: &'static [&'static str],
    pub order_by: &'static [&'static str],
    pub limit: Option<usize>,
    /// Result column names, in SELECT order; `{m}` expands as above
    pub columns: &'static [&'static str],
}

/// The finished product: text plus separately carried values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuery {
    /// Statement text containing only `$n` placeholders for values
    pub query_text: String,

    /// Bound parameters, in placeholder order
    pub bound_parameters: Vec<BoundParameter>,

    /// Query shape
    pub kind: QueryKind,

    /// Set by the security validator; the executor refuses false
    pub security_validated: bool,

    /// Advisory optimizer notes
    pub optimization_notes: Vec<String>,

    /// Human-readable description of what the query asks
    pub explanation: String,

    /// Result column names, in SELECT order
    pub result_columns: Vec<String>,
}

/// Measurement column allowlist: canonical name -> column.
///
/// Column identifiers cannot be bound parameters, so they only ever come
/// from this fixed table, never from query text.
fn measurement_column(canonical: &str) -> Option<&'static str> {
    match canonical {
        "temperature" => Some("temperature"),
        "salinity" => Some("psal"),
        "pressure" => Some("pressure"),
        "oxygen" => Some("doxy"),
        "chlorophyll" => Some("chla"),
        "nitrate" => Some("nitrate"),
        "ph" => Some("ph_in_situ"),
        _ => None,
    }
}

fn default_measurement(intent: Intent) -> &'static str {
    match intent {
        Intent::AnalyzeSalinity => "psal",
        Intent::AnalyzeOxygen => "doxy",
        _ => "temperature",
    }
}

const MEASUREMENT_JOINS: &[&str] = &[
    "JOIN floats f ON f.id = p.float_id",
    "JOIN measurements m ON m.profile_id = p.id",
];

const MEASUREMENT_BASE: &[&str] = &["m.{m} IS NOT NULL", "m.quality_flag IN (1, 2)"];

/// Process-wide template registry, built once at startup
pub struct TemplateRegistry {
    templates: Vec<QueryTemplate>,
    aggregate_cue: Regex,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let mut templates = Vec::new();

        for intent in [
            Intent::AnalyzeTemperature,
            Intent::AnalyzeSalinity,
            Intent::AnalyzeOxygen,
        ] {
            templates.push(QueryTemplate {
                intent,
                kind: QueryKind::Profile,
                select: "SELECT f.platform_number, p.profile_date, p.latitude, p.longitude, m.pressure, m.{m}",
                from: "FROM profiles p",
                joins: MEASUREMENT_JOINS,
                base_conditions: MEASUREMENT_BASE,
                group_by: &[],
                order_by: &["p.profile_date DESC", "m.pressure ASC"],
                limit: None,
                columns: &["platform_number", "profile_date", "latitude", "longitude", "pressure", "{m}"],
            });
            templates.push(QueryTemplate {
                intent,
                kind: QueryKind::Spatial,
                select: "SELECT f.platform_number, p.profile_date, p.latitude, p.longitude, m.pressure, m.{m}",
                from: "FROM profiles p",
                joins: MEASUREMENT_JOINS,
                base_conditions: MEASUREMENT_BASE,
                group_by: &[],
                order_by: &["p.profile_date DESC"],
                limit: None,
                columns: &["platform_number", "profile_date", "latitude", "longitude", "pressure", "{m}"],
            });
            templates.push(QueryTemplate {
                intent,
                kind: QueryKind::Aggregate,
                select: "SELECT count(*) AS sample_count, avg(m.{m}) AS mean_value, min(m.{m}) AS min_value, max(m.{m}) AS max_value",
                from: "FROM profiles p",
                joins: MEASUREMENT_JOINS,
                base_conditions: MEASUREMENT_BASE,
                group_by: &[],
                order_by: &[],
                limit: None,
                columns: &["sample_count", "mean_value", "min_value", "max_value"],
            });
        }

        templates.push(QueryTemplate {
            intent: Intent::CompareData,
            kind: QueryKind::Timeseries,
            select: "SELECT date_trunc('month', p.profile_date) AS month, avg(m.{m}) AS mean_value, count(*) AS sample_count",
            from: "FROM profiles p",
            joins: MEASUREMENT_JOINS,
            base_conditions: MEASUREMENT_BASE,
            group_by: &["date_trunc('month', p.profile_date)"],
            order_by: &["month ASC"],
            limit: None,
            columns: &["month", "mean_value", "sample_count"],
        });

        templates.push(QueryTemplate {
            intent: Intent::Summarize,
            kind: QueryKind::Aggregate,
            select: "SELECT count(*) AS sample_count, avg(m.{m}) AS mean_value, min(m.{m}) AS min_value, max(m.{m}) AS max_value",
            from: "FROM profiles p",
            joins: MEASUREMENT_JOINS,
            base_conditions: MEASUREMENT_BASE,
            group_by: &[],
            order_by: &[],
            limit: None,
            columns: &["sample_count", "mean_value", "min_value", "max_value"],
        });

        templates.push(QueryTemplate {
            intent: Intent::MapFloats,
            kind: QueryKind::FloatLookup,
            select: "SELECT DISTINCT ON (f.platform_number) f.platform_number, p.latitude, p.longitude, p.profile_date",
            from: "FROM profiles p",
            joins: &["JOIN floats f ON f.id = p.float_id"],
            base_conditions: &[],
            group_by: &[],
            order_by: &["f.platform_number", "p.profile_date DESC"],
            limit: None,
            columns: &["platform_number", "latitude", "longitude", "profile_date"],
        });

        templates.push(QueryTemplate {
            intent: Intent::FloatStatus,
            kind: QueryKind::FloatLookup,
            select: "SELECT f.platform_number, f.status, f.deployment_date, max(p.profile_date) AS last_profile_date, count(p.id) AS profile_count",
            from: "FROM floats f",
            joins: &["LEFT JOIN profiles p ON p.float_id = f.id"],
            base_conditions: &[],
            group_by: &["f.platform_number", "f.status", "f.deployment_date"],
            order_by: &[],
            limit: None,
            columns: &["platform_number", "status", "deployment_date", "last_profile_date", "profile_count"],
        });

        templates.push(QueryTemplate {
            intent: Intent::DataAvailability,
            kind: QueryKind::Aggregate,
            select: "SELECT count(DISTINCT f.platform_number) AS float_count, count(p.id) AS profile_count, min(p.profile_date) AS first_profile, max(p.profile_date) AS last_profile",
            from: "FROM profiles p",
            joins: &["JOIN floats f ON f.id = p.float_id"],
            base_conditions: &[],
            group_by: &[],
            order_by: &[],
            limit: None,
            columns: &["float_count", "profile_count", "first_profile", "last_profile"],
        });

        Self {
            templates,
            aggregate_cue: Regex::new(r"(?i)\b(average|mean|median|summary|statistics|overall)\b")
                .expect("aggregate cue pattern"),
        }
    }

    /// Select the template for an analysis.
    ///
    /// Spatial templates win when coordinates were extracted; aggregate
    /// templates win when the text implies a summary; otherwise the first
    /// template registered for the intent.
    pub fn select_for(&self, analysis: &QueryAnalysis) -> Option<&QueryTemplate> {
        let matching: Vec<&QueryTemplate> = self
            .templates
            .iter()
            .filter(|t| t.intent == analysis.intent)
            .collect();

        if matching.is_empty() {
            return None;
        }

        if analysis.spatial.coordinates.is_some() {
            if let Some(t) = matching.iter().find(|t| t.kind == QueryKind::Spatial) {
                return Some(*t);
            }
        }

        if self.aggregate_cue.is_match(&analysis.original_query) {
            if let Some(t) = matching.iter().find(|t| t.kind == QueryKind::Aggregate) {
                return Some(*t);
            }
        }

        matching.first().copied()
    }
}

/// Structured query translator
pub struct QueryTranslator {
    registry: TemplateRegistry,
    validator: SecurityValidator,
    default_row_cap: usize,
}

impl QueryTranslator {
    pub fn new(default_row_cap: usize) -> Self {
        Self {
            registry: TemplateRegistry::new(),
            validator: SecurityValidator::new(),
            default_row_cap,
        }
    }

    /// Translate an analysis into a validated, parameterized query.
    ///
    /// Fails with `AppError::Translation` when no template matches the
    /// intent and `AppError::UnsafeQuery` when validation rejects the
    /// assembled statement.
    pub fn translate(
        &self,
        analysis: &QueryAnalysis,
        extra_params: Option<&HashMap<String, String>>,
    ) -> Result<GeneratedQuery> {
        let template = self
            .registry
            .select_for(analysis)
            .ok_or_else(|| AppError::Translation {
                intent: format!("{:?}", analysis.intent),
            })?;

        let column = self.resolve_measurement(analysis, template);
        let mut builder = SqlBuilder::new(
            template.select.replace("{m}", column),
            template.from,
        );
        for join in template.joins {
            builder.join(*join);
        }
        for condition in template.base_conditions {
            builder.condition(condition.replace("{m}", column));
        }

        let mut explanation_parts: Vec<String> = if column.is_empty() {
            vec![format!("{:?} query", template.kind)]
        } else {
            vec![format!(
                "{:?} query over measurement column '{}'",
                template.kind, column
            )]
        };

        self.bind_spatial(analysis, &mut builder, &mut explanation_parts);
        self.bind_temporal(analysis, &mut builder, &mut explanation_parts);
        self.bind_float_id(analysis, &mut builder, &mut explanation_parts);
        self.bind_parameters_scope(analysis, &mut builder, &mut explanation_parts);
        self.bind_extra(extra_params, &mut builder);

        for group in template.group_by {
            builder.group_by(*group);
        }
        for order in template.order_by {
            builder.order_by(*order);
        }
        if let Some(limit) = template.limit {
            builder.limit(limit);
        }

        // Optimization: best-effort, never blocking
        let mut notes = Vec::new();
        if !builder.has_limit() {
            builder.limit(self.default_row_cap);
            notes.push(format!("applied default row cap of {}", self.default_row_cap));
        }
        if analysis.spatial.coordinates.is_some() {
            notes.push("bounding-box predicate can use the profiles position index".to_string());
        }
        if analysis.temporal.start_date.is_some() {
            notes.push("date predicate can use the profiles date index".to_string());
        }

        let (query_text, bound_parameters) = builder.into_parts();

        self.validator.validate(&query_text, &bound_parameters)?;

        debug!(
            kind = ?template.kind,
            params = bound_parameters.len(),
            "Structured query translated"
        );

        Ok(GeneratedQuery {
            query_text,
            bound_parameters,
            kind: template.kind,
            security_validated: true,
            optimization_notes: notes,
            explanation: explanation_parts.join("; "),
            result_columns: template
                .columns
                .iter()
                .map(|c| c.replace("{m}", column))
                .collect(),
        })
    }

    /// Resolve the measurement column from the parameter scope, falling back
    /// to the intent default; unknown measurements are dropped with a log
    fn resolve_measurement(&self, analysis: &QueryAnalysis, template: &QueryTemplate) -> &'static str {
        if !template.select.contains("{m}") {
            return "";
        }
        for measurement in &analysis.parameters.measurements {
            match measurement_column(measurement) {
                Some(column) => return column,
                None => {
                    warn!(measurement = %measurement, "Unknown measurement dropped");
                }
            }
        }
        default_measurement(analysis.intent)
    }

    fn bind_spatial(
        &self,
        analysis: &QueryAnalysis,
        builder: &mut SqlBuilder,
        explanation: &mut Vec<String>,
    ) {
        if let Some(bbox) = analysis.spatial.coordinates {
            let west = builder.bind("west", BoundValue::Float(bbox.west));
            let east = builder.bind("east", BoundValue::Float(bbox.east));
            builder.condition(format!("p.longitude BETWEEN {} AND {}", west, east));

            let south = builder.bind("south", BoundValue::Float(bbox.south));
            let north = builder.bind("north", BoundValue::Float(bbox.north));
            builder.condition(format!("p.latitude BETWEEN {} AND {}", south, north));

            explanation.push(format!(
                "bounding box ({}, {}) to ({}, {})",
                bbox.west, bbox.south, bbox.east, bbox.north
            ));
        } else if let Some(region) = analysis
            .spatial
            .regions
            .first()
            .or_else(|| analysis.spatial.ocean_basins.first())
        {
            let placeholder = builder.bind("region", BoundValue::string(region));
            builder.condition(format!("lower(p.region) = {}", placeholder));
            explanation.push(format!("region '{}'", region));
        }
    }

    fn bind_temporal(
        &self,
        analysis: &QueryAnalysis,
        builder: &mut SqlBuilder,
        explanation: &mut Vec<String>,
    ) {
        if let Some(start) = analysis.temporal.start_date {
            let placeholder = builder.bind("start_date", BoundValue::Date(start));
            builder.condition(format!("p.profile_date >= {}", placeholder));
            explanation.push(format!("from {}", start));
        }
        if let Some(end) = analysis.temporal.end_date {
            let placeholder = builder.bind("end_date", BoundValue::Date(end));
            builder.condition(format!("p.profile_date <= {}", placeholder));
            explanation.push(format!("to {}", end));
        }
    }

    fn bind_float_id(
        &self,
        analysis: &QueryAnalysis,
        builder: &mut SqlBuilder,
        explanation: &mut Vec<String>,
    ) {
        let float_id = analysis
            .entities
            .iter()
            .find(|e| e.label == EntityLabel::FloatId)
            .and_then(|e| e.normalized_value.as_deref());

        if let Some(raw) = float_id {
            match coerce(raw, ParamKind::Int) {
                Some(value) => {
                    let placeholder = builder.bind("platform_number", value);
                    builder.condition(format!("f.platform_number = {}", placeholder));
                    explanation.push(format!("float {}", raw));
                }
                None => {
                    warn!(value = raw, "Float identifier failed integer coercion, dropped");
                }
            }
        }
    }

    fn bind_parameters_scope(
        &self,
        analysis: &QueryAnalysis,
        builder: &mut SqlBuilder,
        explanation: &mut Vec<String>,
    ) {
        if let Some((min, max)) = analysis.parameters.depth_range {
            let min_ph = builder.bind("depth_min", BoundValue::Float(min));
            let max_ph = builder.bind("depth_max", BoundValue::Float(max));
            builder.condition(format!("m.pressure BETWEEN {} AND {}", min_ph, max_ph));
            explanation.push(format!("depth {} to {} dbar", min, max));
        }

        if let Some(mode) = analysis.parameters.data_mode {
            let placeholder = builder.bind("data_mode", BoundValue::string(&mode.code().to_string()));
            builder.condition(format!("p.data_mode = {}", placeholder));
            explanation.push(format!("data mode {}", mode.code()));
        }
    }

    /// Extra caller-supplied parameters; unknown keys and failed coercions
    /// are dropped, never fatal
    fn bind_extra(&self, extra: Option<&HashMap<String, String>>, builder: &mut SqlBuilder) {
        let Some(extra) = extra else { return };

        for (key, raw) in extra {
            let bound = match key.as_str() {
                "platform_number" => coerce(raw, ParamKind::Int)
                    .map(|v| (v, "f.platform_number = ")),
                "region" => coerce(raw, ParamKind::Str).map(|v| (v, "lower(p.region) = ")),
                "max_pressure" => coerce(raw, ParamKind::Float).map(|v| (v, "m.pressure <= ")),
                _ => {
                    warn!(key = %key, "Unknown extra parameter dropped");
                    None
                }
            };

            match bound {
                Some((value, prefix)) => {
                    let placeholder = builder.bind(key, value);
                    builder.condition(format!("{}{}", prefix, placeholder));
                }
                None => {
                    warn!(key = %key, value = %raw, "Extra parameter failed coercion, dropped");
                }
            }
        }
    }
}

//! Parameterized SQL builder
//!
//! The builder is the only way query text is produced, and it has no path
//! that interpolates a user-influenced value into the text: every value goes
//! through [`SqlBuilder::bind`], which appends a typed parameter and returns
//! its `$n` placeholder. String values are additionally sanitized at
//! construction as defense in depth.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A typed bound value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum BoundValue {
    Str(String),
    Date(NaiveDate),
    Float(f64),
    Int(i64),
}

impl BoundValue {
    /// Sanitized string value: quotes, backslashes, and semicolons stripped
    pub fn string(raw: &str) -> Self {
        let sanitized: String = raw
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | '\\' | ';'))
            .collect();
        BoundValue::Str(sanitized)
    }

    /// Convert to a sea-orm value for statement binding
    pub fn to_sea_value(&self) -> sea_orm::Value {
        match self {
            BoundValue::Str(s) => s.clone().into(),
            BoundValue::Date(d) => (*d).into(),
            BoundValue::Float(f) => (*f).into(),
            BoundValue::Int(i) => (*i).into(),
        }
    }
}

/// Expected parameter type for coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Date,
    Float,
    Int,
}

/// Coerce a raw textual value into a typed bound value.
///
/// Returns `None` when the value cannot be coerced; callers drop the
/// parameter and log rather than aborting the whole query.
pub fn coerce(raw: &str, kind: ParamKind) -> Option<BoundValue> {
    let raw = raw.trim();
    match kind {
        ParamKind::Str => {
            if raw.is_empty() {
                None
            } else {
                Some(BoundValue::string(raw))
            }
        }
        ParamKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(BoundValue::Date),
        ParamKind::Float => raw.parse::<f64>().ok().map(BoundValue::Float),
        ParamKind::Int => raw.parse::<i64>().ok().map(BoundValue::Int),
    }
}

/// A named bound parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundParameter {
    pub name: String,
    pub value: BoundValue,
}

/// Builder assembling a single parameterized SELECT statement
pub struct SqlBuilder {
    select: String,
    from: String,
    joins: Vec<String>,
    conditions: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
    params: Vec<BoundParameter>,
}

impl SqlBuilder {
    pub fn new(select: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            from: from.into(),
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            params: Vec::new(),
        }
    }

    pub fn join(&mut self, join: impl Into<String>) -> &mut Self {
        self.joins.push(join.into());
        self
    }

    /// Bind a value and get its `$n` placeholder back
    pub fn bind(&mut self, name: &str, value: BoundValue) -> String {
        self.params.push(BoundParameter {
            name: name.to_string(),
            value,
        });
        format!("${}", self.params.len())
    }

    /// Append a WHERE condition; placeholders must come from [`bind`]
    pub fn condition(&mut self, condition: impl Into<String>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn group_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.order_by.push(expr.into());
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }

    pub fn params(&self) -> &[BoundParameter] {
        &self.params
    }

    /// Render the statement text
    pub fn render(&self) -> String {
        let mut sql = String::with_capacity(256);
        sql.push_str(&self.select);
        sql.push(' ');
        sql.push_str(&self.from);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    pub fn into_parts(self) -> (String, Vec<BoundParameter>) {
        let sql = self.render();
        (sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_never_reach_query_text() {
        let mut builder = SqlBuilder::new(
            "SELECT p.profile_date",
            "FROM profiles p",
        );
        let placeholder = builder.bind("region", BoundValue::string("arabian'; DROP TABLE floats--"));
        let condition = format!("lower(p.region) = {}", placeholder);
        builder.condition(condition);

        let (sql, params) = builder.into_parts();

        assert!(!sql.contains("arabian"));
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("= $1"));
        assert_eq!(params.len(), 1);

        // The sanitized value survives as a parameter, not as text
        match &params[0].value {
            BoundValue::Str(s) => {
                assert!(!s.contains('\''));
                assert!(!s.contains(';'));
                assert!(s.contains("DROP TABLE floats"));
            }
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholders_numbered_in_order() {
        let mut builder = SqlBuilder::new("SELECT 1", "FROM profiles p");
        let a = builder.bind("start", BoundValue::Date(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()));
        let b = builder.bind("end", BoundValue::Date(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()));
        assert_eq!(a, "$1");
        assert_eq!(b, "$2");
    }

    #[test]
    fn test_render_shape() {
        let mut builder = SqlBuilder::new("SELECT count(*) AS n", "FROM profiles p");
        builder
            .join("JOIN floats f ON f.id = p.float_id")
            .condition("p.profile_date >= $1")
            .order_by("p.profile_date DESC")
            .limit(100);

        let sql = builder.render();
        assert!(sql.starts_with("SELECT count(*) AS n FROM profiles p JOIN floats f"));
        assert!(sql.contains("WHERE p.profile_date >= $1"));
        assert!(sql.ends_with("LIMIT 100"));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce("2902746", ParamKind::Int), Some(BoundValue::Int(2902746)));
        assert_eq!(coerce("12.5", ParamKind::Float), Some(BoundValue::Float(12.5)));
        assert_eq!(
            coerce("2024-10-01", ParamKind::Date),
            Some(BoundValue::Date(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()))
        );
        assert_eq!(coerce("not a number", ParamKind::Int), None);
        assert_eq!(coerce("2024-13-99", ParamKind::Date), None);
        assert_eq!(coerce("", ParamKind::Str), None);
    }
}

//! Security validation for generated queries
//!
//! Mandatory and blocking: a query that fails any check is never handed to
//! the relational executor. The builder already makes injection structurally
//! impossible for bound values; this validator is the independent second
//! check over the assembled text and parameters.

use argonaut_common::errors::{AppError, Result};
use regex_lite::Regex;

use super::builder::{BoundParameter, BoundValue};

/// Maximum JOINs allowed in one statement
const MAX_JOINS: usize = 5;

/// Maximum nested subqueries allowed
const MAX_SUBQUERIES: usize = 3;

/// Query text validator
pub struct SecurityValidator {
    mutating: Regex,
    union_select: Regex,
    numeric_tautology: Regex,
    string_tautology: Regex,
    join: Regex,
    subquery: Regex,
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityValidator {
    pub fn new() -> Self {
        Self {
            mutating: Regex::new(
                r"(?i)\b(drop|delete|insert|update|alter|create|truncate|grant|revoke|exec|execute|merge|call)\b",
            )
            .expect("mutating keyword pattern"),
            union_select: Regex::new(r"(?i)\bunion\s+(all\s+)?select\b")
                .expect("union select pattern"),
            numeric_tautology: Regex::new(r"(?i)\b(or|and)\s+(\d+)\s*=\s*(\d+)")
                .expect("numeric tautology pattern"),
            string_tautology: Regex::new(r"(?i)\b(or|and)\s+'([^']*)'\s*=\s*'([^']*)'")
                .expect("string tautology pattern"),
            join: Regex::new(r"(?i)\bjoin\b").expect("join pattern"),
            subquery: Regex::new(r"(?i)\(\s*select\b").expect("subquery pattern"),
        }
    }

    /// Validate the assembled statement and its parameters
    pub fn validate(&self, sql: &str, params: &[BoundParameter]) -> Result<()> {
        let trimmed = sql.trim();

        if !trimmed
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"))
        {
            return Err(AppError::UnsafeQuery {
                reason: "only read-only SELECT statements are allowed".to_string(),
            });
        }

        if trimmed.contains(';') {
            return Err(AppError::UnsafeQuery {
                reason: "multiple statements are not allowed".to_string(),
            });
        }

        if trimmed.contains("--") || trimmed.contains("/*") {
            return Err(AppError::UnsafeQuery {
                reason: "comment sequences are not allowed".to_string(),
            });
        }

        if let Some(m) = self.mutating.find(trimmed) {
            return Err(AppError::UnsafeQuery {
                reason: format!("mutating keyword '{}' is not allowed", m.as_str()),
            });
        }

        if self.union_select.is_match(trimmed) {
            return Err(AppError::UnsafeQuery {
                reason: "UNION SELECT is not allowed".to_string(),
            });
        }

        for caps in self
            .numeric_tautology
            .captures_iter(trimmed)
            .chain(self.string_tautology.captures_iter(trimmed))
        {
            let lhs = caps.get(2).map(|m| m.as_str());
            let rhs = caps.get(3).map(|m| m.as_str());
            if lhs == rhs {
                return Err(AppError::UnsafeQuery {
                    reason: "tautological condition is not allowed".to_string(),
                });
            }
        }

        let join_count = self.join.find_iter(trimmed).count();
        if join_count > MAX_JOINS {
            return Err(AppError::UnsafeQuery {
                reason: format!("{} joins exceed the limit of {}", join_count, MAX_JOINS),
            });
        }

        let subquery_count = self.subquery.find_iter(trimmed).count();
        if subquery_count > MAX_SUBQUERIES {
            return Err(AppError::UnsafeQuery {
                reason: format!(
                    "{} subqueries exceed the limit of {}",
                    subquery_count, MAX_SUBQUERIES
                ),
            });
        }

        for param in params {
            if let BoundValue::Str(s) = &param.value {
                if s.contains('\'') || s.contains('"') || s.contains('\\') || s.contains(';') {
                    return Err(AppError::UnsafeQuery {
                        reason: format!("parameter '{}' contains unsanitized characters", param.name),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SecurityValidator {
        SecurityValidator::new()
    }

    #[test]
    fn test_clean_query_passes() {
        let sql = "SELECT p.profile_date, m.psal FROM profiles p \
                   JOIN measurements m ON m.profile_id = p.id \
                   WHERE p.profile_date >= $1 AND p.profile_date <= $2 LIMIT 100";
        assert!(validator().validate(sql, &[]).is_ok());
    }

    #[test]
    fn test_drop_table_rejected() {
        let sql = "SELECT 1 FROM profiles p WHERE 1 IN (SELECT 1) DROP TABLE floats";
        let err = validator().validate(sql, &[]).unwrap_err();
        assert!(matches!(err, AppError::UnsafeQuery { .. }));
    }

    #[test]
    fn test_non_select_rejected() {
        let err = validator()
            .validate("DELETE FROM floats", &[])
            .unwrap_err();
        assert!(matches!(err, AppError::UnsafeQuery { .. }));
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = validator()
            .validate("SELECT 1; SELECT 2", &[])
            .unwrap_err();
        assert!(matches!(err, AppError::UnsafeQuery { .. }));
    }

    #[test]
    fn test_comment_rejected() {
        assert!(validator().validate("SELECT 1 -- comment", &[]).is_err());
        assert!(validator().validate("SELECT 1 /* comment */", &[]).is_err());
    }

    #[test]
    fn test_union_select_rejected() {
        assert!(validator()
            .validate("SELECT 1 UNION SELECT password FROM users", &[])
            .is_err());
        assert!(validator()
            .validate("SELECT 1 UNION ALL SELECT 2", &[])
            .is_err());
    }

    #[test]
    fn test_tautology_rejected() {
        assert!(validator()
            .validate("SELECT 1 FROM floats WHERE x = $1 OR 1=1", &[])
            .is_err());
        assert!(validator()
            .validate("SELECT 1 FROM floats WHERE x = $1 OR 'a'='a'", &[])
            .is_err());
    }

    #[test]
    fn test_inequality_comparison_allowed() {
        assert!(validator()
            .validate("SELECT 1 FROM measurements m WHERE m.quality_flag = $1 AND 1 = 2", &[])
            .is_ok());
    }

    #[test]
    fn test_join_limit() {
        let joins = "JOIN t ON a = b ".repeat(6);
        let sql = format!("SELECT 1 FROM profiles p {}", joins);
        assert!(validator().validate(&sql, &[]).is_err());
    }

    #[test]
    fn test_subquery_limit() {
        let sql = "SELECT 1 FROM t WHERE a IN (SELECT x FROM (SELECT y FROM (SELECT z FROM (SELECT w FROM u))))";
        assert!(validator().validate(sql, &[]).is_err());
    }

    #[test]
    fn test_unsanitized_parameter_rejected() {
        let params = vec![BoundParameter {
            name: "region".to_string(),
            value: BoundValue::Str("arabian'; drop".to_string()),
        }];
        assert!(validator().validate("SELECT 1 FROM t", &params).is_err());
    }
}

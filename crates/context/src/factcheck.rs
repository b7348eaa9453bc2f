//! Fact checking
//!
//! Two independent, best-effort checks over generated prose. Both flag,
//! never block or rewrite: the report travels as metadata alongside the
//! answer.

use argonaut_search::executor::Row;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Antonym pairs whose co-occurrence suggests a contradiction
const ANTONYM_PAIRS: &[(&str, &str)] = &[
    ("increase", "decrease"),
    ("higher", "lower"),
    ("warm", "cold"),
    ("shallow", "deep"),
];

/// Fact-check report attached to an answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactCheckReport {
    /// Numbers in the prose that fall outside the observed value envelope
    pub numeric_flags: Vec<String>,

    /// Antonym pairs that co-occur in the prose
    pub contradiction_flags: Vec<String>,
}

impl FactCheckReport {
    pub fn is_clean(&self) -> bool {
        self.numeric_flags.is_empty() && self.contradiction_flags.is_empty()
    }

    pub fn flag_count(&self) -> usize {
        self.numeric_flags.len() + self.contradiction_flags.len()
    }
}

/// Best-effort consistency checker
pub struct FactChecker {
    number: Regex,
}

impl Default for FactChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl FactChecker {
    pub fn new() -> Self {
        Self {
            number: Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern"),
        }
    }

    /// Run both checks over the generated prose
    pub fn check(&self, prose: &str, rows: &[Row]) -> FactCheckReport {
        let mut report = FactCheckReport::default();

        self.check_numeric_consistency(prose, rows, &mut report);
        self.check_contradictions(prose, &mut report);

        report
    }

    /// Every bare number in the prose is compared against the envelope
    /// [0.5 x min, 2 x max] of the numeric fields in the structured rows
    fn check_numeric_consistency(&self, prose: &str, rows: &[Row], report: &mut FactCheckReport) {
        let observed: Vec<f64> = rows
            .iter()
            .flat_map(|row| row.iter())
            .filter_map(|(_, value)| value.as_f64())
            .collect();

        let (Some(min), Some(max)) = (
            observed.iter().cloned().fold(None, fold_min),
            observed.iter().cloned().fold(None, fold_max),
        ) else {
            return;
        };

        let lower = 0.5 * min;
        let upper = 2.0 * max;

        for m in self.number.find_iter(prose) {
            let Ok(value) = m.as_str().parse::<f64>() else {
                continue;
            };
            if value < lower || value > upper {
                report.numeric_flags.push(format!(
                    "{} is outside the observed envelope [{:.2}, {:.2}]",
                    m.as_str(),
                    lower,
                    upper
                ));
            }
        }
    }

    fn check_contradictions(&self, prose: &str, report: &mut FactCheckReport) {
        let lower = prose.to_lowercase();
        for (a, b) in ANTONYM_PAIRS {
            if lower.contains(a) && lower.contains(b) {
                report
                    .contradiction_flags
                    .push(format!("both '{}' and '{}' appear", a, b));
            }
        }
    }
}

fn fold_min(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

fn fold_max(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with_values(values: &[f64]) -> Vec<Row> {
        vec![values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("col{}", i), serde_json::json!(v)))
            .collect()]
    }

    #[test]
    fn test_in_envelope_numbers_pass() {
        let checker = FactChecker::new();
        let rows = rows_with_values(&[10.0, 20.0]);

        let report = checker.check("the mean was 15.3 with values up to 20", &rows);
        assert!(report.numeric_flags.is_empty());
    }

    #[test]
    fn test_out_of_envelope_number_flagged() {
        let checker = FactChecker::new();
        let rows = rows_with_values(&[10.0, 20.0]);

        // Envelope is [5, 40]; 120 falls outside
        let report = checker.check("a spike of 120 degrees was recorded", &rows);
        assert_eq!(report.numeric_flags.len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_no_rows_skips_numeric_check() {
        let checker = FactChecker::new();
        let report = checker.check("the value was 999999", &[]);
        assert!(report.numeric_flags.is_empty());
    }

    #[test]
    fn test_contradiction_flagged() {
        let checker = FactChecker::new();
        let report = checker.check(
            "salinity tends to increase in summer and decrease in winter",
            &[],
        );
        assert_eq!(report.contradiction_flags.len(), 1);
    }

    #[test]
    fn test_single_antonym_not_flagged() {
        let checker = FactChecker::new();
        let report = checker.check("temperatures were higher than average", &[]);
        assert!(report.contradiction_flags.is_empty());
    }
}

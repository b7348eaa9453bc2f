//! Metrics and observability utilities
//!
//! Registers pipeline metric descriptions, initializes tracing, and provides
//! a small latency timer used around external calls.

use crate::config::ObservabilityConfig;
use metrics::{describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Argonaut metrics
pub const METRICS_PREFIX: &str = "argonaut";

/// Initialize the tracing subscriber from configuration.
///
/// Safe to call once per process; subsequent calls are no-ops because the
/// global subscriber is already set.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_ok() {
        tracing::info!(service = %config.service_name, "Tracing initialized");
    }
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total queries processed"
    );

    describe_counter!(
        format!("{}_route_total", METRICS_PREFIX),
        Unit::Count,
        "Queries per routing path (temporal/semantic)"
    );

    describe_histogram!(
        format!("{}_analyze_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Query understanding latency in seconds"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Vector retrieval latency in seconds"
    );

    describe_histogram!(
        format!("{}_translation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Structured query translation latency in seconds"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation service latency in seconds"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Cache hits across embedding and result caches"
    );

    describe_counter!(
        format!("{}_degraded_answers_total", METRICS_PREFIX),
        Unit::Count,
        "Answers degraded by pipeline failure"
    );
}

/// Latency timer that records a histogram on drop
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        histogram!(self.name.clone()).record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_init_tracing_twice_is_safe() {
        let config = ObservabilityConfig {
            log_level: "info".to_string(),
            json_logging: false,
            service_name: "argonaut-test".to_string(),
        };
        init_tracing(&config);
        init_tracing(&config);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let timer = Timer::start(format!("{}_analyze_duration_seconds", METRICS_PREFIX));
        drop(timer);
    }
}

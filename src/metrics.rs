//! Observability hooks.
//!
//! With the `metrics` feature, [`METRICS`] registers instruments on the global
//! OpenTelemetry meter; wiring an exporter is up to the application. With the
//! `tracing` feature, [`tracing_helpers`] builds the spans that wrap statement
//! execution and connection setup.

#[cfg(feature = "metrics")]
pub use self::otel::{LuxMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
    };
    use std::time::Duration;

    pub static METRICS: Lazy<LuxMetrics> = Lazy::new(LuxMetrics::init);

    pub struct LuxMetrics {
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub cache_hits_total: Counter<u64>,
        pub cache_misses_total: Counter<u64>,
    }

    impl LuxMetrics {
        pub fn init() -> Self {
            let meter = global::meter("lux-model");

            let queries_total = meter
                .u64_counter("lux_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("lux_query_errors_total")
                .with_description("Statements that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("lux_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            let cache_hits_total = meter
                .u64_counter("lux_cache_hits_total")
                .with_description("Query results served from the cache")
                .build();

            let cache_misses_total = meter
                .u64_counter("lux_cache_misses_total")
                .with_description("Query results computed after a cache miss")
                .build();

            Self {
                queries_total,
                query_errors_total,
                query_duration,
                cache_hits_total,
                cache_misses_total,
            }
        }

        pub fn record_query(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_cache_hit(&self) {
            self.cache_hits_total.add(1, &[]);
        }

        pub fn record_cache_miss(&self) {
            self.cache_misses_total.add(1, &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::info_span!("lux.execute_query", db.statement = %sql)
    }

    pub fn acquire_connection_span() -> Span {
        tracing::info_span!("lux.acquire_connection")
    }

    pub fn query_execute_span(model: &str, collection: bool) -> Span {
        tracing::debug_span!("lux.query", model = %model, collection)
    }

    pub fn migration_gate_span(path: &str) -> Span {
        tracing::info_span!("lux.migration_gate", migrations_path = %path)
    }
}

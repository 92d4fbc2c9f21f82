//! Prometheus metrics for the attribute index.
//!
//! Recording a metric never fails a query or a mutation; the counters are
//! plain atomics and registration happens once at startup.
//!
//! # Example
//! ```no_run
//! use attribute_index::metrics::{init_metrics, gather_metrics, SEARCH_QUERIES_TOTAL};
//!
//! init_metrics().unwrap();
//! SEARCH_QUERIES_TOTAL.with_label_values(&["exact", "ok"]).inc();
//! println!("{}", gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "attribute_index";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Queries executed against a collection
    ///
    /// Labels: kind (all, exact, wildcard, text, range), outcome (ok, error)
    pub static ref SEARCH_QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_queries_total", "Total number of collection queries")
            .namespace(NAMESPACE),
        &["kind", "outcome"]
    ).expect("Failed to create SEARCH_QUERIES_TOTAL metric");

    /// Wall time of one collection fan-out
    ///
    /// Labels: kind
    pub static ref SEARCH_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "search_query_duration_seconds",
            "Collection query duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["kind"]
    ).expect("Failed to create SEARCH_QUERY_DURATION_SECONDS metric");

    /// Documents built or removed
    ///
    /// Labels: outcome (indexed, failed, deleted)
    pub static ref DOCUMENTS_INDEXED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("documents_indexed_total", "Total number of document mutations")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create DOCUMENTS_INDEXED_TOTAL metric");

    /// Whole-index saves
    ///
    /// Labels: outcome (written, skipped, error)
    pub static ref INDEX_SAVES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("index_saves_total", "Total number of index save attempts")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create INDEX_SAVES_TOTAL metric");

    /// Duration of full reindex runs
    pub static ref REINDEX_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("reindex_duration_seconds", "Full reindex duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
    ).expect("Failed to create REINDEX_DURATION_SECONDS metric");
}

/// Register every metric with the global registry
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_QUERIES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_QUERY_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DOCUMENTS_INDEXED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INDEX_SAVES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(REINDEX_DURATION_SECONDS.clone()))?;
    Ok(())
}

/// Render the registry in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

/// Record the outcome and duration of one query
pub fn record_query(kind: &str, ok: bool, elapsed_secs: f64) {
    let outcome = if ok { "ok" } else { "error" };
    SEARCH_QUERIES_TOTAL.with_label_values(&[kind, outcome]).inc();
    SEARCH_QUERY_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(elapsed_secs);
}

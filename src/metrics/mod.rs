//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Context window metrics
    pub context_truncations: Counter,
    pub context_window_tokens: Histogram,

    // Memory service metrics
    pub memory_requests: CounterVec,
    pub memory_request_duration: HistogramVec,
    pub memory_context_injected: Counter,
    pub memory_context_skipped: CounterVec,
    pub memory_facts_extracted: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> crate::error::Result<Self> {
        let registry = Registry::new();

        let context_truncations = register_counter_with_registry!(
            Opts::new(
                "context_truncations_total",
                "Conversations truncated to fit the token budget"
            ),
            registry
        )?;

        let context_window_tokens = register_histogram_with_registry!(
            "context_window_tokens",
            "Estimated token count of assembled context windows",
            registry
        )?;

        let memory_requests = register_counter_vec_with_registry!(
            Opts::new("memory_requests_total", "Memory service requests"),
            &["operation", "status"],
            registry
        )?;

        let memory_request_duration = register_histogram_vec_with_registry!(
            "memory_request_duration_seconds",
            "Memory service request duration in seconds",
            &["operation"],
            registry
        )?;

        let memory_context_injected = register_counter_with_registry!(
            Opts::new(
                "memory_context_injected_total",
                "Requests that received a memory context block"
            ),
            registry
        )?;

        let memory_context_skipped = register_counter_vec_with_registry!(
            Opts::new(
                "memory_context_skipped_total",
                "Requests where memory enhancement was skipped"
            ),
            &["reason"],
            registry
        )?;

        let memory_facts_extracted = register_counter_with_registry!(
            Opts::new(
                "memory_facts_extracted_total",
                "Candidate facts extracted from user messages"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            context_truncations,
            context_window_tokens,
            memory_requests,
            memory_request_duration,
            memory_context_injected,
            memory_context_skipped,
            memory_facts_extracted,
        })
    }

    /// Registry handle for callers that expose a scrape endpoint
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

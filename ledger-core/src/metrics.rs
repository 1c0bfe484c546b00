//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_invocations_total{function}` - Calls dispatched
//! - `ledger_invocation_failures_total{function,code}` - Calls rejected
//! - `ledger_invocation_duration_seconds` - Histogram of call latencies
//! - `ledger_events_total{event}` - Audit events committed

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
///
/// Collectors are registered in an owned registry only, so several ledgers
/// can live in one process.
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Calls dispatched, by function
    pub invocations_total: IntCounterVec,

    /// Calls rejected, by function and error code
    pub failures_total: IntCounterVec,

    /// Call latency histogram
    pub invocation_duration: Histogram,

    /// Audit events committed, by name
    pub events_total: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let invocations_total = IntCounterVec::new(
            Opts::new("ledger_invocations_total", "Total number of calls dispatched"),
            &["function"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new("ledger_invocation_failures_total", "Total number of rejected calls"),
            &["function", "code"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let invocation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_invocation_duration_seconds",
                "Histogram of call latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(invocation_duration.clone()))?;

        let events_total = IntCounterVec::new(
            Opts::new("ledger_events_total", "Total number of audit events committed"),
            &["event"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        Ok(Self {
            invocations_total,
            failures_total,
            invocation_duration,
            events_total,
            registry,
        })
    }

    /// Record a dispatched call
    pub fn record_invocation(&self, function: &str, duration_seconds: f64) {
        self.invocations_total.with_label_values(&[function]).inc();
        self.invocation_duration.observe(duration_seconds);
    }

    /// Record a rejected call
    pub fn record_failure(&self, function: &str, code: &str) {
        self.failures_total.with_label_values(&[function, code]).inc();
    }

    /// Record a committed audit event
    pub fn record_event(&self, event: &str) {
        self.events_total.with_label_values(&[event]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode every registered collector in the Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

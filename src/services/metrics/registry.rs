use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics for the monitoring engine and notification pipeline
pub struct MonitorMetrics {
    registry: Registry,

    // Probe Metrics
    pub probes_total: CounterVec,
    pub probe_duration_seconds: Histogram,
    pub probes_skipped_total: Counter,
    pub probes_in_flight: Gauge,

    // State Metrics
    pub status_transitions_total: CounterVec,
    pub persistence_errors_total: CounterVec,

    // Notification Metrics
    pub notifications_total: CounterVec,
}

impl MonitorMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let probes_total = CounterVec::new(
            Opts::new("probes_total", "Executed probes by raw verdict").namespace("pulsewatch"),
            &["verdict"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let probe_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("probe_duration_seconds", "Wall-clock probe duration")
                .namespace("pulsewatch")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let probes_skipped_total = Counter::with_opts(
            Opts::new("probes_skipped_total", "Due probes skipped because one was still in flight")
                .namespace("pulsewatch"),
        )?;
        registry.register(Box::new(probes_skipped_total.clone()))?;

        let probes_in_flight = Gauge::with_opts(
            Opts::new("probes_in_flight", "Probes currently running").namespace("pulsewatch"),
        )?;
        registry.register(Box::new(probes_in_flight.clone()))?;

        let status_transitions_total = CounterVec::new(
            Opts::new("status_transitions_total", "Confirmed status transitions")
                .namespace("pulsewatch"),
            &["transition"],
        )?;
        registry.register(Box::new(status_transitions_total.clone()))?;

        let persistence_errors_total = CounterVec::new(
            Opts::new("persistence_errors_total", "Failed persistence gateway calls")
                .namespace("pulsewatch"),
            &["operation"],
        )?;
        registry.register(Box::new(persistence_errors_total.clone()))?;

        let notifications_total = CounterVec::new(
            Opts::new("notifications_total", "Notifications by provider and outcome")
                .namespace("pulsewatch"),
            &["provider", "outcome"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            probes_total,
            probe_duration_seconds,
            probes_skipped_total,
            probes_in_flight,
            status_transitions_total,
            persistence_errors_total,
            notifications_total,
        }))
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

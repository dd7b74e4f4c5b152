//! Metrics collection and exposition.
//!
//! # Metrics
//! - `httpeek_hops_total` (counter): completed hops by response status
//! - `httpeek_trace_errors_total` (counter): failed hops by error kind
//! - `httpeek_hop_duration_seconds` (histogram): wall time of a hop
//! - `httpeek_phase_duration_seconds` (histogram): timeline events by phase
//! - `httpeek_api_requests_total` (counter): `/trace` calls by status
//! - `httpeek_api_request_duration_seconds` (histogram): `/trace` latency
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::trace::model::TimelineEvent;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(address = %addr, error = %err, "Failed to install metrics exporter"),
    }
}

/// Record one completed hop and the phases of its timeline.
pub fn record_hop(status: u16, duration: Duration, timeline: &[TimelineEvent]) {
    ::metrics::counter!("httpeek_hops_total", "status" => status.to_string()).increment(1);
    ::metrics::histogram!("httpeek_hop_duration_seconds").record(duration.as_secs_f64());

    for event in timeline {
        ::metrics::histogram!("httpeek_phase_duration_seconds", "phase" => event.label.metric_name())
            .record(event.duration.as_secs_f64());
    }
}

/// Record a hop that failed before a response arrived.
pub fn record_error(kind: &'static str) {
    ::metrics::counter!("httpeek_trace_errors_total", "kind" => kind).increment(1);
}

/// Record one API call to `/trace`.
pub fn record_api_request(status: u16, start_time: Instant) {
    ::metrics::counter!("httpeek_api_requests_total", "status" => status.to_string()).increment(1);
    ::metrics::histogram!("httpeek_api_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

//! Prometheus metrics HTTP server and stats publishing.
//!
//! The pipeline crate keeps plain atomic counters per output. This module
//! installs the global recorder and turns [`OutputStats`] snapshots into
//! `metrics` counters and gauges.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

use logship_core::config::MetricsConfig;
use logship_core::metrics as m;
use logship_core::pipeline::OutputStats;

/// Parse the configured listen address.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process.
///
/// # Errors
///
/// - The endpoint or listen address is invalid
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

/// Publish one output's statistics snapshot.
///
/// Counters are set to their absolute values, so publishing the same
/// snapshot twice is harmless.
pub fn publish_output_stats(output: &str, stats: &OutputStats) {
    let label = output.to_owned();
    let counters = [
        (m::OUTPUT_EVENTS_RECEIVED_TOTAL, stats.received),
        (m::OUTPUT_EVENTS_FILTERED_TOTAL, stats.filtered),
        (m::OUTPUT_MESSAGES_ENQUEUED_TOTAL, stats.enqueued),
        (m::OUTPUT_MESSAGES_DELIVERED_TOTAL, stats.delivered),
        (m::OUTPUT_MESSAGES_LOST_TOTAL, stats.lost),
        (m::OUTPUT_MESSAGES_OVERFLOW_TOTAL, stats.overflow_dropped),
        (m::OUTPUT_FAILED_CYCLES_TOTAL, stats.failed_cycles),
        (m::OUTPUT_FILTER_PANICS_TOTAL, stats.panics),
    ];
    for (name, value) in counters {
        metrics::counter!(name, m::LABEL_OUTPUT => label.clone()).absolute(value);
    }
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::OUTPUT_QUEUE_LENGTH, m::LABEL_OUTPUT => label).set(stats.queue_len as f64);
}

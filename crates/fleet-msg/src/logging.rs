//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Structured logging and metrics for telemetry delivery."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use tracing::debug;

use crate::types::Message;

/// Emit a structured log entry for an outbound message.
pub fn log_message(transport: &str, message: &Message) {
    debug!(
        message_id = %message.id,
        timestamp = %message.timestamp,
        channel = %message.channel,
        key = %message.key,
        transport,
        schema_version = message.schema_version,
        failure_occurred = message.record.failure_occurred,
        "telemetry published"
    );
}

/// Prometheus metric handles for telemetry delivery.
#[derive(Clone)]
pub struct MessagingMetricsExporter {
    sent: IntCounter,
    dropped: IntCounter,
    failure_snapshots: IntCounter,
    latency: Histogram,
}

impl MessagingMetricsExporter {
    /// Register delivery metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let sent = IntCounter::with_opts(Opts::new(
            "fleet_messages_sent_total",
            "Telemetry messages accepted by transports",
        ))?;
        let dropped = IntCounter::with_opts(Opts::new(
            "fleet_messages_dropped_total",
            "Telemetry messages that failed to deliver",
        ))?;
        let failure_snapshots = IntCounter::with_opts(Opts::new(
            "fleet_failure_snapshots_total",
            "Published snapshots carrying an active failure mode",
        ))?;
        let latency = Histogram::with_opts(HistogramOpts::new(
            "fleet_publish_latency_seconds",
            "Time spent encoding and handing a message to all transports",
        ))?;

        registry.register(Box::new(sent.clone()))?;
        registry.register(Box::new(dropped.clone()))?;
        registry.register(Box::new(failure_snapshots.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            sent,
            dropped,
            failure_snapshots,
            latency,
        })
    }

    /// Record a delivered message.
    pub fn observe_sent(&self) {
        self.sent.inc();
    }

    /// Record a dropped message.
    pub fn observe_dropped(&self) {
        self.dropped.inc();
    }

    /// Record a snapshot labelled with a failure.
    pub fn observe_failure_snapshot(&self) {
        self.failure_snapshots.inc();
    }

    /// Record publish latency.
    pub fn observe_latency(&self, duration: Duration) {
        self.latency.observe(duration.as_secs_f64());
    }
}

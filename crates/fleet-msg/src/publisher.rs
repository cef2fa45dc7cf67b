//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Publisher mapping snapshots onto transports."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fleet_sim::Snapshot;

use crate::logging::log_message;
use crate::{
    ChannelNaming, Message, MessagingError, MessagingMetricsExporter, Result, TelemetryRecord,
    Transport,
};

/// Counters describing publisher activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublisherMetrics {
    /// Snapshots handed to the publisher.
    pub published: u64,
    /// Transport sends that succeeded.
    pub sent: u64,
    /// Transport sends that failed.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PublisherMetrics {
        PublisherMetrics {
            published: self.published.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializes vehicle snapshots and fans them out to every registered transport.
///
/// Delivery is fire-and-forget: a failing transport is logged and counted as a
/// drop, and the snapshot is not retried.
pub struct TelemetryPublisher {
    transports: Vec<Arc<dyn Transport>>,
    naming: ChannelNaming,
    counters: Counters,
    exporter: Option<MessagingMetricsExporter>,
}

impl TelemetryPublisher {
    /// Construct a publisher addressing channels with `naming`.
    pub fn new(naming: ChannelNaming) -> Self {
        Self {
            transports: Vec::new(),
            naming,
            counters: Counters::default(),
            exporter: None,
        }
    }

    /// Mirror counters into prometheus metrics.
    pub fn with_metrics(mut self, exporter: MessagingMetricsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Register a concrete transport.
    pub fn register_transport<T>(&mut self, transport: Arc<T>)
    where
        T: Transport + 'static,
    {
        self.transports.push(transport as Arc<dyn Transport>);
    }

    /// Register an already type-erased transport.
    pub fn add_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transports.push(transport);
    }

    /// Channel naming used for outgoing messages.
    pub fn naming(&self) -> &ChannelNaming {
        &self.naming
    }

    /// Publish a snapshot to all registered transports, returning the number
    /// of transports that accepted it.
    pub fn publish(&self, snapshot: &Snapshot) -> Result<usize> {
        if self.transports.is_empty() {
            return Err(MessagingError::Config("no transports registered".into()));
        }
        let started = Instant::now();
        let channel = self.naming.channel_for(snapshot.vehicle_id);
        let message = Message::new(channel, TelemetryRecord::from(snapshot));
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        for transport in &self.transports {
            match transport.send(&message) {
                Ok(()) => {
                    log_message(transport.name(), &message);
                    self.counters.sent.fetch_add(1, Ordering::Relaxed);
                    if let Some(exporter) = &self.exporter {
                        exporter.observe_sent();
                    }
                    delivered += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        transport = transport.name(),
                        vehicle_id = snapshot.vehicle_id,
                        error = %err,
                        "transport send failed"
                    );
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    if let Some(exporter) = &self.exporter {
                        exporter.observe_dropped();
                    }
                }
            }
        }

        if let Some(exporter) = &self.exporter {
            if snapshot.failure_occurred {
                exporter.observe_failure_snapshot();
            }
            exporter.observe_latency(started.elapsed());
        }
        Ok(delivered)
    }

    /// Flush every transport, returning the first error after trying all.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for transport in &self.transports {
            if let Err(err) = transport.flush() {
                tracing::warn!(transport = transport.name(), error = %err, "transport flush failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Return the current counters.
    pub fn metrics(&self) -> PublisherMetrics {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use fleet_sim::{FailureProfile, VehicleSimulator};

    struct BrokenTransport;

    impl Transport for BrokenTransport {
        fn send(&self, _msg: &Message) -> Result<()> {
            Err(MessagingError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "endpoint gone",
            )))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn snapshot(vehicle_id: u32) -> Snapshot {
        VehicleSimulator::seeded(vehicle_id, FailureProfile::default(), 1).advance()
    }

    #[test]
    fn publish_and_poll_cycle() {
        let mut publisher = TelemetryPublisher::new(ChannelNaming::default());
        let transport = Arc::new(InMemoryTransport::new());
        publisher.register_transport(transport.clone());

        let delivered = publisher.publish(&snapshot(3)).expect("publish succeeds");
        assert_eq!(delivered, 1);

        let received = transport.recv().expect("message available");
        assert_eq!(received.channel, "car3");
        assert_eq!(received.key, "3");
        assert_eq!(received.record.id, 3);

        let metrics = publisher.metrics();
        assert_eq!(metrics.published, 1);
        assert_eq!(metrics.sent, 1);
        assert_eq!(metrics.dropped, 0);
    }

    #[test]
    fn failing_transport_counts_as_dropped() {
        let mut publisher = TelemetryPublisher::new(ChannelNaming::default());
        let healthy = Arc::new(InMemoryTransport::new());
        publisher.register_transport(Arc::new(BrokenTransport));
        publisher.register_transport(healthy.clone());

        let delivered = publisher.publish(&snapshot(1)).expect("publish continues");
        assert_eq!(delivered, 1);
        assert_eq!(healthy.len(), 1);
        assert_eq!(publisher.metrics().dropped, 1);
    }

    #[test]
    fn publish_without_transports_is_an_error() {
        let publisher = TelemetryPublisher::new(ChannelNaming::default());
        assert!(matches!(
            publisher.publish(&snapshot(0)),
            Err(MessagingError::Config(_))
        ));
    }

    #[test]
    fn exporter_mirrors_counters() {
        let registry = prometheus::Registry::new();
        let exporter = MessagingMetricsExporter::register(&registry).expect("register");
        let mut publisher =
            TelemetryPublisher::new(ChannelNaming::FleetWide { name: "fleet".into() })
                .with_metrics(exporter);
        publisher.register_transport(Arc::new(InMemoryTransport::new()));
        publisher.publish(&snapshot(2)).expect("publish");

        let sent = registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == "fleet_messages_sent_total")
            .expect("sent counter registered");
        assert_eq!(sent.get_metric()[0].get_counter().get_value(), 1.0);

        let failures = registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == "fleet_failure_snapshots_total")
            .expect("failure counter registered");
        // Default profile always latches shock failures on the first step.
        assert_eq!(failures.get_metric()[0].get_counter().get_value(), 1.0);
    }
}

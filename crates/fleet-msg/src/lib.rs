//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry wire records, codecs and transports."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Serialization and delivery of vehicle snapshots.
//!
//! Snapshots produced by `fleet-sim` are mapped onto a [`TelemetryRecord`],
//! wrapped in a [`Message`] keyed by vehicle id and addressed to a channel,
//! then handed to one or more [`Transport`]s by the [`TelemetryPublisher`].

pub mod channel;
pub mod codec;
pub mod logging;
pub mod publisher;
pub mod transport;
pub mod types;

/// Shared result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Errors raised while encoding or delivering telemetry.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Wrapper for IO errors encountered by stream transports.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for CBOR serialization or deserialization problems.
    #[error("cbor error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    /// Transport configuration is incomplete or inconsistent.
    #[error("invalid transport configuration: {0}")]
    Config(String),
    /// A frame exceeded the maximum length accepted by the stream framing.
    #[error("frame of {0} bytes exceeds the maximum frame length")]
    FrameTooLarge(usize),
}

pub use channel::ChannelNaming;
pub use codec::WireFormat;
pub use logging::{log_message, MessagingMetricsExporter};
pub use publisher::{PublisherMetrics, TelemetryPublisher};
pub use transport::{
    build_transport, InMemoryTransport, StreamTransport, Transport, TransportConfig,
    TransportKind,
};
pub use types::{Message, TelemetryRecord, SCHEMA_VERSION};

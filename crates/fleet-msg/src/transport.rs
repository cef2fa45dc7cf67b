//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Transport backends delivering encoded telemetry."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ChannelNaming, Message, MessagingError, Result, WireFormat};

/// Capacity of the in-memory queue created from configuration.
pub const DEFAULT_IN_MEMORY_CAPACITY: usize = 1024;

/// Largest CBOR frame written or accepted by the stream framing.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Transport abstraction used by all delivery backends.
///
/// Delivery is at-most-once: a failed send is reported to the caller and never
/// retried by the transport.
pub trait Transport: Send + Sync {
    /// Send a message into the transport.
    fn send(&self, msg: &Message) -> Result<()>;
    /// Push any buffered data to the underlying sink.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
    /// Human-readable transport name for logging/metrics.
    fn name(&self) -> &'static str;
}

/// Transport kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Bounded in-process queue, primarily for tests and dry runs.
    InMemory,
    /// Encoded frames written to standard output.
    #[default]
    Stdout,
    /// Encoded frames appended to a file.
    File,
    /// Encoded frames streamed to a TCP endpoint.
    Tcp,
}

impl TransportKind {
    /// Name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::InMemory => "in_memory",
            TransportKind::Stdout => "stdout",
            TransportKind::File => "file",
            TransportKind::Tcp => "tcp",
        }
    }
}

/// Configuration of the transport a producer publishes to.
///
/// The endpoint is always supplied explicitly; transports never consult the
/// process environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransportConfig {
    /// Backend to construct.
    #[serde(default)]
    pub kind: TransportKind,
    /// `host:port` of the TCP endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Output file for the file transport.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Encoding of each frame.
    #[serde(default)]
    pub format: WireFormat,
    /// Channel addressing.
    #[serde(default)]
    pub channel: ChannelNaming,
}

impl TransportConfig {
    /// Check that the selected backend has everything it needs.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            TransportKind::Tcp
                if self
                    .endpoint
                    .as_deref()
                    .map_or(true, |endpoint| endpoint.trim().is_empty()) =>
            {
                return Err(MessagingError::Config(
                    "tcp transport requires an endpoint".into(),
                ));
            }
            TransportKind::File if self.path.is_none() => {
                return Err(MessagingError::Config(
                    "file transport requires a path".into(),
                ));
            }
            _ => {}
        }
        if self.channel.is_empty() {
            return Err(MessagingError::Config("channel name must not be empty".into()));
        }
        Ok(())
    }
}

/// Construct the transport described by `config`.
pub fn build_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>> {
    config.validate()?;
    let transport: Arc<dyn Transport> = match config.kind {
        TransportKind::InMemory => Arc::new(InMemoryTransport::with_capacity(
            DEFAULT_IN_MEMORY_CAPACITY,
        )),
        TransportKind::Stdout => Arc::new(StreamTransport::stdout(config.format)),
        TransportKind::File => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| MessagingError::Config("file transport requires a path".into()))?;
            Arc::new(StreamTransport::append_file(path, config.format)?)
        }
        TransportKind::Tcp => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                MessagingError::Config("tcp transport requires an endpoint".into())
            })?;
            Arc::new(StreamTransport::connect(endpoint, config.format)?)
        }
    };
    info!(
        transport = transport.name(),
        format = config.format.as_str(),
        "transport ready"
    );
    Ok(transport)
}

/// In-memory transport backed by a mutex protected queue.
///
/// When a capacity is set the oldest message is discarded once the queue is
/// full.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    queue: Arc<Mutex<VecDeque<Message>>>,
    capacity: Option<usize>,
}

impl InMemoryTransport {
    /// Create an unbounded in-memory channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel retaining at most `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: Some(capacity),
        }
    }

    /// Pop the oldest queued message.
    pub fn recv(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// Remove and return every queued message.
    pub fn drain(&self) -> Vec<Message> {
        self.queue.lock().drain(..).collect()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// `true` when no message is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, msg: &Message) -> Result<()> {
        let mut guard = self.queue.lock();
        if let Some(capacity) = self.capacity {
            while guard.len() >= capacity.max(1) {
                guard.pop_front();
            }
        }
        guard.push_back(msg.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Transport writing framed messages to any byte sink.
///
/// JSON frames are terminated by `\n`; CBOR frames are preceded by their
/// length as a big-endian `u32`.
pub struct StreamTransport<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
    format: WireFormat,
    name: &'static str,
}

impl<W: Write + Send> StreamTransport<W> {
    /// Wrap an arbitrary writer.
    pub fn new(writer: W, format: WireFormat, name: &'static str) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            format,
            name,
        }
    }

    /// Consume the transport, flushing and returning the inner writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .into_inner()
            .map_err(|err| MessagingError::Io(err.into_error()))
    }
}

impl StreamTransport<io::Stdout> {
    /// Frames written to standard output.
    pub fn stdout(format: WireFormat) -> Self {
        Self::new(io::stdout(), format, "stdout")
    }
}

impl StreamTransport<std::fs::File> {
    /// Frames appended to `path`, creating the file when missing.
    pub fn append_file(path: &Path, format: WireFormat) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file, format, "file"))
    }
}

impl StreamTransport<TcpStream> {
    /// Frames streamed over a TCP connection to `endpoint`.
    pub fn connect(endpoint: &str, format: WireFormat) -> Result<Self> {
        let stream = TcpStream::connect(endpoint)?;
        stream.set_nodelay(true)?;
        info!(endpoint, "tcp transport connected");
        Ok(Self::new(stream, format, "tcp"))
    }
}

impl<W: Write + Send> Transport for StreamTransport<W> {
    fn send(&self, msg: &Message) -> Result<()> {
        let bytes = self.format.encode(msg)?;
        let mut writer = self.writer.lock();
        match self.format {
            WireFormat::Json => {
                writer.write_all(&bytes)?;
                writer.write_all(b"\n")?;
            }
            WireFormat::Cbor => {
                if bytes.len() > MAX_FRAME_LEN {
                    return Err(MessagingError::FrameTooLarge(bytes.len()));
                }
                let len = bytes.len() as u32;
                writer.write_all(&len.to_be_bytes())?;
                writer.write_all(&bytes)?;
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Decode every frame written by a [`StreamTransport`] using `format`.
pub fn read_frames<R: Read>(reader: R, format: WireFormat) -> Result<Vec<Message>> {
    let mut reader = BufReader::new(reader);
    let mut messages = Vec::new();
    match format {
        WireFormat::Json => {
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                messages.push(format.decode(line.as_bytes())?);
            }
        }
        WireFormat::Cbor => loop {
            let mut len = [0u8; 4];
            match reader.read_exact(&mut len) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err.into()),
            }
            let len = u32::from_be_bytes(len) as usize;
            if len > MAX_FRAME_LEN {
                return Err(MessagingError::FrameTooLarge(len));
            }
            let mut frame = vec![0u8; len];
            reader.read_exact(&mut frame)?;
            messages.push(format.decode(&frame)?);
        },
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelemetryRecord;
    use fleet_sim::{FailureProfile, VehicleSimulator};

    fn messages(count: usize) -> Vec<Message> {
        let mut sim = VehicleSimulator::seeded(4, FailureProfile::default(), 12);
        (0..count)
            .map(|_| Message::new("car4", TelemetryRecord::from(&sim.advance())))
            .collect()
    }

    #[test]
    fn in_memory_transport_send_and_recv() {
        let transport = InMemoryTransport::new();
        let sent = messages(2);
        for message in &sent {
            transport.send(message).expect("send succeeds");
        }
        assert_eq!(transport.len(), 2);
        assert_eq!(transport.recv().expect("message available").id, sent[0].id);
        assert_eq!(transport.drain().len(), 1);
        assert!(transport.is_empty());
    }

    #[test]
    fn bounded_in_memory_transport_drops_oldest() {
        let transport = InMemoryTransport::with_capacity(2);
        let sent = messages(3);
        for message in &sent {
            transport.send(message).expect("send succeeds");
        }
        let kept: Vec<_> = transport.drain().into_iter().map(|m| m.id).collect();
        assert_eq!(kept, vec![sent[1].id, sent[2].id]);
    }

    #[test]
    fn stream_transport_frames_json_lines() {
        let transport = StreamTransport::new(Vec::new(), WireFormat::Json, "buffer");
        for message in &messages(3) {
            transport.send(message).expect("send succeeds");
        }
        let bytes = transport.into_inner().expect("flush buffer");
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 3);
        let decoded = read_frames(bytes.as_slice(), WireFormat::Json).expect("decode");
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn stream_transport_frames_cbor_with_length_prefix() {
        let sent = messages(2);
        let transport = StreamTransport::new(Vec::new(), WireFormat::Cbor, "buffer");
        for message in &sent {
            transport.send(message).expect("send succeeds");
        }
        let bytes = transport.into_inner().expect("flush buffer");
        let decoded = read_frames(bytes.as_slice(), WireFormat::Cbor).expect("decode");
        assert_eq!(decoded, sent);
    }

    #[test]
    fn validate_requires_backend_settings() {
        let tcp = TransportConfig {
            kind: TransportKind::Tcp,
            ..TransportConfig::default()
        };
        assert!(matches!(tcp.validate(), Err(MessagingError::Config(_))));

        let file = TransportConfig {
            kind: TransportKind::File,
            ..TransportConfig::default()
        };
        assert!(file.validate().is_err());

        let fleet_wide = TransportConfig {
            channel: ChannelNaming::FleetWide { name: String::new() },
            ..TransportConfig::default()
        };
        assert!(fleet_wide.validate().is_err());

        assert!(TransportConfig::default().validate().is_ok());
    }

    #[test]
    fn build_transport_appends_to_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("telemetry.ndjson");
        let config = TransportConfig {
            kind: TransportKind::File,
            path: Some(path.clone()),
            ..TransportConfig::default()
        };
        let transport = build_transport(&config)?;
        for message in &messages(2) {
            transport.send(message)?;
        }
        transport.flush()?;
        let decoded = read_frames(std::fs::File::open(&path)?, WireFormat::Json)?;
        assert_eq!(decoded.len(), 2);
        assert_eq!(transport.name(), "file");
        Ok(())
    }

    #[test]
    fn tcp_transport_streams_to_listener() -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let endpoint = listener.local_addr()?.to_string();
        let reader = std::thread::spawn(move || -> anyhow::Result<Vec<Message>> {
            let (stream, _) = listener.accept()?;
            Ok(read_frames(stream, WireFormat::Cbor)?)
        });

        let sent = messages(2);
        let transport = StreamTransport::connect(&endpoint, WireFormat::Cbor)?;
        for message in &sent {
            transport.send(message)?;
        }
        drop(transport.into_inner()?);

        let received = reader.join().expect("reader thread")?;
        assert_eq!(received, sent);
        Ok(())
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut bytes = u32::MAX.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let err = read_frames(bytes.as_slice(), WireFormat::Cbor).expect_err("oversized frame");
        assert!(matches!(err, MessagingError::FrameTooLarge(len) if len == u32::MAX as usize));

        let mut bytes = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
        bytes.push(0);
        assert!(matches!(
            read_frames(bytes.as_slice(), WireFormat::Cbor),
            Err(MessagingError::FrameTooLarge(_))
        ));
    }
}

//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "binary"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Binary entrypoint for the fleet telemetry producer."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
mod driver;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use fleet_common::config::AppConfig;
use fleet_common::logging::init_tracing;
use fleet_common::version::VersionInfo;
use fleet_msg::{
    build_transport, MessagingMetricsExporter, TelemetryPublisher, TransportKind, WireFormat,
};
use fleet_sim::Fleet;
use prometheus::proto::MetricType;
use prometheus::Registry;
use tokio::signal;
use tracing::{info, warn};

use crate::driver::{drive, RunLimits};

const DEFAULT_CONFIG_PATH: &str = "configs/fleet.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Simulate an electric vehicle fleet and publish its telemetry",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    /// Number of simulated vehicles
    #[arg(long)]
    vehicles: Option<u32>,

    /// Stop after this many ticks
    #[arg(long)]
    iterations: Option<u64>,

    /// Stop after this many seconds of wall-clock time
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Interval between ticks in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Transport receiving the telemetry
    #[arg(long, value_enum)]
    transport: Option<CliTransport>,

    /// TCP endpoint (`host:port`) for the tcp transport
    #[arg(long, env = "FLEET_ENDPOINT")]
    endpoint: Option<String>,

    /// Output file for the file transport
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Encoding of each published frame
    #[arg(long, value_enum)]
    format: Option<CliFormat>,

    /// Fleet seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTransport {
    InMemory,
    Stdout,
    File,
    Tcp,
}

impl From<CliTransport> for TransportKind {
    fn from(value: CliTransport) -> Self {
        match value {
            CliTransport::InMemory => TransportKind::InMemory,
            CliTransport::Stdout => TransportKind::Stdout,
            CliTransport::File => TransportKind::File,
            CliTransport::Tcp => TransportKind::Tcp,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    Json,
    Cbor,
}

impl From<CliFormat> for WireFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Json => WireFormat::Json,
            CliFormat::Cbor => WireFormat::Cbor,
        }
    }
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(vehicles) = self.vehicles {
            config.fleet.vehicles = vehicles;
        }
        if let Some(iterations) = self.iterations {
            config.fleet.iterations = Some(iterations);
        }
        if let Some(secs) = self.duration_secs {
            config.fleet.run_duration = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = self.interval_ms {
            config.fleet.tick_interval = Duration::from_millis(ms);
        }
        if let Some(seed) = self.seed {
            config.fleet.seed = Some(seed);
        }
        if let Some(kind) = self.transport {
            config.transport.kind = kind.into();
        }
        if let Some(endpoint) = &self.endpoint {
            config.transport.endpoint = Some(endpoint.clone());
        }
        if let Some(output) = &self.output {
            config.transport.path = Some(output.clone());
        }
        if let Some(format) = self.format {
            config.transport.format = format.into();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let (mut config, config_path) = match &cli.config {
        Some(path) => (AppConfig::from_path(path)?, Some(path.clone())),
        None => {
            let loaded = AppConfig::load_with_source(&[PathBuf::from(DEFAULT_CONFIG_PATH)])?;
            (loaded.config, loaded.source)
        }
    };
    cli.apply_overrides(&mut config);
    config
        .validate()
        .context("configuration invalid after applying command line overrides")?;

    init_tracing("fleet-producer", &config.logging)?;
    info!(
        version = %version,
        config = ?config_path,
        transport = config.transport.kind.as_str(),
        format = config.transport.format.as_str(),
        "configuration loaded"
    );

    let registry = Registry::new();
    let exporter = MessagingMetricsExporter::register(&registry)?;
    let mut publisher =
        TelemetryPublisher::new(config.transport.channel.clone()).with_metrics(exporter);
    publisher.add_transport(build_transport(&config.transport)?);
    let publisher = Arc::new(publisher);

    let mut fleet = Fleet::new(&config.fleet_spec());
    let limits = RunLimits::from(&config.fleet);
    let summary = drive(&mut fleet, &publisher, &limits, shutdown_signal()).await?;

    let metrics = publisher.metrics();
    info!(
        ticks = summary.ticks,
        published = metrics.published,
        sent = metrics.sent,
        dropped = metrics.dropped,
        "producer shut down"
    );
    log_registry_totals(&registry);
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received; shutting down"),
        Err(err) => {
            warn!(error = %err, "unable to listen for ctrl-c; relying on run limits");
            std::future::pending::<()>().await;
        }
    }
}

fn log_registry_totals(registry: &Registry) {
    for family in registry.gather() {
        for metric in family.get_metric() {
            match family.get_field_type() {
                MetricType::COUNTER => {
                    info!(
                        metric = family.get_name(),
                        value = metric.get_counter().get_value(),
                        "metric total"
                    );
                }
                MetricType::HISTOGRAM => {
                    let histogram = metric.get_histogram();
                    info!(
                        metric = family.get_name(),
                        samples = histogram.get_sample_count(),
                        sum_seconds = histogram.get_sample_sum(),
                        "metric total"
                    );
                }
                _ => {}
            }
        }
    }
}

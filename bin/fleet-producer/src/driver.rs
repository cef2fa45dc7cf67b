//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "binary"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Tick loop advancing the fleet and publishing snapshots."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use fleet_common::FleetConfig;
use fleet_msg::TelemetryPublisher;
use fleet_sim::{Fleet, Snapshot};
use tokio::task;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// When the tick loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub tick_interval: Duration,
    pub iterations: Option<u64>,
    pub run_duration: Option<Duration>,
}

impl From<&FleetConfig> for RunLimits {
    fn from(config: &FleetConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            iterations: config.iterations,
            run_duration: config.run_duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    DurationElapsed,
    ShutdownRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub snapshots: u64,
    /// Snapshot deliveries accepted across all transports.
    pub accepted: u64,
    pub stop_reason: StopReason,
}

/// Advance every vehicle once per tick and publish the resulting snapshots
/// until a limit is reached or `shutdown` resolves. Transports are flushed
/// before returning.
///
/// Transport writes are synchronous and run on the blocking pool.
pub async fn drive<F>(
    fleet: &mut Fleet,
    publisher: &Arc<TelemetryPublisher>,
    limits: &RunLimits,
    shutdown: F,
) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let deadline = limits.run_duration.map(|duration| Instant::now() + duration);
    let mut ticker = interval(limits.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks = 0u64;
    let mut snapshots = 0u64;
    let mut accepted = 0u64;

    info!(
        vehicles = fleet.len(),
        interval_ms = limits.tick_interval.as_millis() as u64,
        iterations = ?limits.iterations,
        duration_secs = ?limits.run_duration.map(|d| d.as_secs()),
        "producer loop started"
    );

    let stop_reason = loop {
        if limits.iterations.is_some_and(|limit| ticks >= limit) {
            break StopReason::IterationLimit;
        }

        let deadline_reached = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let stop = tokio::select! {
            biased;
            _ = &mut shutdown => Some(StopReason::ShutdownRequested),
            _ = deadline_reached => Some(StopReason::DurationElapsed),
            _ = ticker.tick() => {
                let batch = fleet.advance_all();
                snapshots += batch.len() as u64;
                let tick_publisher = Arc::clone(publisher);
                accepted += task::spawn_blocking(move || publish_batch(&tick_publisher, &batch))
                    .await??;
                ticks += 1;
                debug!(tick = ticks, "fleet advanced");
                None
            }
        };
        if let Some(reason) = stop {
            break reason;
        }
    };

    let flush_publisher = Arc::clone(publisher);
    task::spawn_blocking(move || flush_publisher.flush()).await??;
    info!(ticks, snapshots, accepted, reason = ?stop_reason, "producer loop stopped");
    Ok(RunSummary {
        ticks,
        snapshots,
        accepted,
        stop_reason,
    })
}

fn publish_batch(publisher: &TelemetryPublisher, batch: &[Snapshot]) -> fleet_msg::Result<u64> {
    let mut accepted = 0u64;
    for snapshot in batch {
        accepted += publisher.publish(snapshot)? as u64;
    }
    Ok(accepted)
}

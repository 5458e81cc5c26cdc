//! Periodic resolve-and-publish loop
//!
//! Cycles never overlap: the loop awaits each cycle before waiting for the
//! next tick, ticks missed in the meantime are skipped, and an ad-hoc
//! [`PollScheduler::run_cycle`] that finds a cycle in flight does nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::broadcast_hub::{BroadcastHub, PublishReport};
use crate::services::snapshot_aggregator::SnapshotAggregator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct RunningPoll {
    token: CancellationToken,
    // Detached on stop so an in-flight cycle can finish
    _task: JoinHandle<()>,
}

pub struct PollScheduler {
    aggregator: Arc<SnapshotAggregator>,
    hub: Arc<BroadcastHub>,
    interval: Duration,
    running: Mutex<Option<RunningPoll>>,
    cycle_guard: Mutex<()>,
    completed_cycles: AtomicU64,
}

impl PollScheduler {
    pub fn new(
        aggregator: Arc<SnapshotAggregator>,
        hub: Arc<BroadcastHub>,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            hub,
            interval,
            running: Mutex::new(None),
            cycle_guard: Mutex::new(()),
            completed_cycles: AtomicU64::new(0),
        }
    }

    /// Stopped → Running. Runs a cycle immediately, then every interval.
    ///
    /// Returns false if already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return false;
        }

        let token = CancellationToken::new();
        let scheduler = Arc::clone(self);
        let loop_token = token.clone();
        let period = self.interval;

        let task = tokio::spawn(async move {
            // The first tick completes immediately.
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Status polling started (interval: {:?})", period);
            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        scheduler.run_cycle().await;
                    }
                }
            }
            info!("Status polling stopped");
        });

        *running = Some(RunningPoll { token, _task: task });
        true
    }

    /// Running → Stopped. An in-flight cycle completes but nothing is scheduled after it.
    ///
    /// Returns false if already stopped.
    pub async fn stop(&self) -> bool {
        match self.running.lock().await.take() {
            Some(poll) => {
                poll.token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn state(&self) -> SchedulerState {
        if self.running.lock().await.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Resolve once and publish the result.
    ///
    /// Returns `None` when another cycle is in flight.
    pub async fn run_cycle(&self) -> Option<PublishReport> {
        let Ok(_cycle) = self.cycle_guard.try_lock() else {
            debug!("Poll cycle already in flight, skipping");
            return None;
        };

        let snapshot = self.aggregator.resolve_status().await;
        let report = match self.hub.publish(&snapshot).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to publish server status: {}", e);
                PublishReport::default()
            }
        };

        let cycle = self.completed_cycles.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            cycle,
            origin = %snapshot.origin,
            players = snapshot.players,
            subscribers = report.delivered,
            "Poll cycle complete"
        );
        Some(report)
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::Relaxed)
    }
}
